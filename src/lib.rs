pub mod util;
pub mod warn;
pub mod time_guard;
pub mod boxed_error;
pub mod easy_fs;
pub mod io_util;
pub mod str_util;
pub mod wicket {
    pub mod error;
    pub mod variables;
    pub mod substitute;
    pub mod head;
    pub mod directive;
    pub mod resolver;
    pub mod strip;
    pub mod compose;
}
pub mod http_response_status_codes;
pub mod ppath;
pub mod router;
pub mod url_encoding;
pub mod query_string;
pub mod markdown;
pub mod webutils;
pub mod handler;
pub mod apachelog;
pub mod config;
pub mod webparts;
pub mod server;
