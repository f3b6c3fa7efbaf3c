use anyhow::Result;
use clap::Parser;
use wicket_mockup::config::Opts;
use wicket_mockup::server::MockupServer;
use wicket_mockup::warn::set_verbose;
use wicket_mockup::info;

fn main() -> Result<()> {
    let opts = Opts::parse();
    set_verbose(opts.verbose);
    opts.check()?;
    if !opts.server {
        eprintln!("Configuration ok, pass --server to start the server.");
        return Ok(())
    }
    let addr = opts.listen_addr()?;
    let server = MockupServer::from_opts(&opts)?;
    info!("serving fragments from {:?}", opts.template_expansion);
    server.run(addr)
}
