//! Putting the handlers together into the request processing of
//! the mockup server, and running it with rouille.

use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow, bail};
use rouille::{Server, Request, Response, input::basic_http_auth};

use crate::apachelog::{log_combined, Logs};
use crate::config::Opts;
use crate::handler::{Handler, FileHandler, DirIndexHandler};
use crate::http_response_status_codes::HttpResponseStatusCode;
use crate::ppath::PPath;
use crate::router::MultiRouter;
use crate::webparts::{FragmentKind, listing_handler, fragment_handler,
                      markdownpage_handler, post_echo_handler};
use crate::webutils::errorpage_from_status;
use crate::wicket::{compose::Composer, resolver::{FragmentResolver, TreeLocator}};
use crate::{time_guard, info};

const AUTH_REALM: &str = "Authorization Required";

pub struct MockupServer {
    /// Tried first, for every request.
    static_files: FileHandler,
    /// User and password, if required.
    basic_auth: Option<(String, String)>,
    router: MultiRouter<Arc<dyn Handler>>,
    logs: Mutex<Logs>,
}

impl MockupServer {
    pub fn new(
        static_files: FileHandler,
        basic_auth: Option<(String, String)>,
        router: MultiRouter<Arc<dyn Handler>>,
        logs: Logs,
    ) -> Self {
        MockupServer { static_files, basic_auth, router, logs: Mutex::new(logs) }
    }

    /// The routes:
    /// `/` entry page, `/pages` etc. listings, `/pages/...` etc.
    /// composed fragments, `/doc` documentation files and
    /// `/test/post` for echoing form submissions.
    pub fn from_opts(opts: &Opts) -> Result<Self> {
        let composer = Arc::new(Composer::new(
            FragmentResolver::new(TreeLocator::new(opts.template_expansion.clone())),
            opts.engine_config()));
        let live_reload = if opts.reload { Some(opts.reload_port) } else { None };

        let mut router: MultiRouter<Arc<dyn Handler>> = MultiRouter::new();
        router.add("/", Arc::new(markdownpage_handler(opts.entry_page.clone(), live_reload)));
        for kind in FragmentKind::members() {
            let path = format!("/{}", kind.route());
            router
                .add(&path, Arc::new(listing_handler(opts.template_scope.clone(), *kind,
                                                     live_reload)))
                .add(&path, Arc::new(fragment_handler(composer.clone(), live_reload,
                                                      opts.code)));
        }
        router
            .add("/doc", Arc::new(FileHandler::new(&opts.doc_root)))
            .add("/doc", Arc::new(DirIndexHandler::new(&opts.doc_root, "/doc")))
            .add("/test/post", Arc::new(post_echo_handler()));

        let logs = match &opts.log_dir {
            Some(dir) => Logs::open_in_dir(dir)?,
            None => Logs::stderr(),
        };
        Ok(MockupServer::new(FileHandler::new(&opts.static_root),
                             opts.basic_auth(),
                             router,
                             logs))
    }

    fn is_authorized(&self, request: &Request) -> bool {
        match &self.basic_auth {
            None => true,
            Some((user, password)) => match basic_http_auth(request) {
                Some(credentials) =>
                    credentials.login == *user && credentials.password == *password,
                None => false
            }
        }
    }

    fn route(&self, request: &Request, path: &PPath) -> Result<Response> {
        if let Some((handlers, rest)) = self.router.get(path) {
            for handler in handlers {
                if let Some(response) = handler.call(request, &rest)? {
                    return Ok(response)
                }
            }
        }
        Ok(errorpage_from_status(HttpResponseStatusCode::NotFound404))
    }

    /// Static files, then the auth check, then the routes.
    pub fn handle(&self, request: &Request) -> Response {
        time_guard!("handle"); // timings including infrastructure cost
        info!("{} {}", request.method(), request.raw_url());
        let response = log_combined(request, &self.logs, || -> Result<Response> {
            let path = PPath::from_str(&request.url());
            if let Some(response) = self.static_files.call(request, &path)? {
                return Ok(response)
            }
            if !self.is_authorized(request) {
                return Ok(Response::basic_http_auth_login_required(AUTH_REALM))
            }
            self.route(request, &path)
        });
        rouille::content_encoding::apply(request, response)
    }

    /// Serve on `addr`. Only returns on failure.
    pub fn run(self, addr: String) -> Result<()> {
        let this = Arc::new(self);
        let server = Server::new(addr.clone(), move |request| this.handle(request))
            .map_err(|e| anyhow!("starting server on {addr:?}: {e}"))?;
        eprintln!("Static server listening on http://{}", server.server_addr());
        server.run();
        bail!("Server stopped.")
    }
}
