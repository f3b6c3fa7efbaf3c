//! Write HTTP access log files in the Combined Log Format (extended
//! Common Log Format) for access logs (Apache style), as per
//! <https://httpd.apache.org/docs/2.4/logs.html>.

use std::mem::swap;
use std::panic;
use std::path::Path;
use std::sync::Mutex;
use std::{time::{Duration, SystemTime, Instant}, io::{stderr, BufWriter}};
use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc, Datelike, Timelike};
use rouille::{Request, Response, ResponseBody, input::basic_http_auth};

use crate::easy_fs::open_log_output;
use crate::http_response_status_codes::HttpResponseStatusCode;
use crate::webutils::errorpage_with_message;
use crate::{try_result, warn};

static MONTHS: &[&str; 12] = &["Jan", "Feb", "Mar", "Apr", "May", "Jun",
                               "Jul", "Aug", "Sep", "Oct", "Nov", "Dec"];

// "06/Dec/2023:02:02:47 +0000"
pub fn write_time(
    outp: &mut impl Write,
    time: SystemTime
) -> Result<()> {
    let dt: DateTime<Utc> = DateTime::from(time);
    write!(outp, "{:02}/{}/{:04}:{:02}:{:02}:{:02} +0000",
           dt.day(), MONTHS[dt.month0() as usize], dt.year(),
           dt.hour(), dt.minute(), dt.second())?;
    Ok(())
}

fn request_line(request: &Request) -> String {
    format!("{} {} HTTP/1.1", request.method(), request.raw_url())
}

// 18.134.151.89 - - [06/Dec/2023:02:02:47 +0100] "GET /login.jsp HTTP/1.1" 404 447 "-" "curl/8.4.0"
// with the duration added at the end.

/// Write to access.log
pub fn write_combined(
    outp: &mut impl Write,
    request: &Request,
    duration: Duration,
    response: &mut Response, // temporarily swaps out ResponseBody and back
) -> Result<()> {
    // The time when the log entry is made, not when the request
    // started
    let now = SystemTime::now();
    let user = basic_http_auth(request).map(|c| c.login);
    write!(outp, "{} - {} [", request.remote_addr().ip(), user.as_deref().unwrap_or("-"))?;
    write_time(outp, now)?;
    let len = {
        // The body length is only available by taking the body apart
        // and putting it back together.
        let mut responsebody = ResponseBody::empty();
        swap(&mut responsebody, &mut response.data);
        let (data, length) = responsebody.into_reader_and_size();
        responsebody =
            if let Some(len) = length {
                ResponseBody::from_reader_and_size(data, len)
            } else {
                ResponseBody::from_reader(data)
            };
        swap(&mut responsebody, &mut response.data);
        length
    };
    writeln!(outp, "] {:?} {} {} {:?} {:?} {duration:?}",
             request_line(request),
             response.status_code,
             len.unwrap_or(0),
             request.header("Referer").unwrap_or("-"),
             request.header("User-Agent").unwrap_or("-"))?;
    outp.flush()?;
    Ok(())
}

/// Write to error.log
fn write_error(
    outp: &mut impl Write,
    request: &Request,
    duration: Duration,
    err: &anyhow::Error,
) -> Result<()> {
    let now = SystemTime::now();
    write!(outp, "[")?;
    write_time(outp, now)?;
    writeln!(outp, "] [error] [client {}] {:?} {duration:?}: {err:#}",
             request.remote_addr().ip(),
             request_line(request))?;
    outp.flush()?;
    Ok(())
}

/// Panic log to stderr. Panics on errors logging to stderr.
fn write_panic_stderr(
    request: &Request,
    duration: Duration
) {
    try_result!{
        let mut outp = BufWriter::new(stderr().lock());
        writeln!(&mut outp, "[panic] handling {:?} after {duration:?}",
                 request_line(request))?;
        outp.flush()?;
        Ok::<(), std::io::Error>(())
    }.expect("stderr always writable");
}


/// The log outputs: the access log for requests answered, the error
/// log for requests whose handler failed. Should do buffering, the
/// code calls flush once per entry.
pub struct Logs {
    pub access_log: Box<dyn Write + Send + Sync>,
    pub error_log: Box<dyn Write + Send + Sync>,
}

impl Logs {
    pub fn stderr() -> Logs {
        Logs {
            access_log: Box::new(stderr()),
            error_log: Box::new(stderr()),
        }
    }

    /// `access.log` and `error.log` in `logdir`, appended to.
    pub fn open_in_dir(logdir: &Path) -> Result<Logs> {
        Ok(Logs {
            access_log: open_log_output(logdir.join("access.log"))?,
            error_log: open_log_output(logdir.join("error.log"))?,
        })
    }
}


// rouille::log_custom would not give the handler's error result to
// the logger, thus this is a copy adapted from it.

/// Run `handler`, log the outcome, and turn errors into an error
/// page. Panics are logged and resumed.
pub fn log_combined<F>(
    request: &Request,
    logs: &Mutex<Logs>,
    handler: F
) -> Response
where
    F: FnOnce() -> anyhow::Result<Response>,
{
    let start_instant = Instant::now();

    // Call the handler and catch panics. We always resume unwinding
    // afterwards.
    let result = panic::catch_unwind(panic::AssertUnwindSafe(handler));
    let elapsed = start_instant.elapsed();

    match result {
        Ok(Ok(mut response)) => {
            {
                let mut logs = logs.lock().expect(
                    "if `write` panics then we are lost anyway");
                if let Err(e) = write_combined(&mut logs.access_log, request, elapsed,
                                               &mut response) {
                    warn!("could not write to access log: {e:#}")
                }
            }
            response
        }
        Ok(Err(err)) => {
            {
                let mut logs = logs.lock().expect(
                    "if `write` panics then we are lost anyway");
                if let Err(e) = write_error(&mut logs.error_log, request, elapsed, &err) {
                    warn!("could not write to error log: {e:#}")
                }
            }
            errorpage_with_message(HttpResponseStatusCode::InternalServerError500,
                                   &format!("{err:#}"))
        }
        Err(payload) => {
            write_panic_stderr(request, elapsed);
            // The panic handler will print the payload contents
            panic::resume_unwind(payload);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use anyhow::anyhow;

    /// A `Write` collecting into a shared buffer.
    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Shared {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn t_write_time() {
        let mut out = Vec::new();
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(1701828167);
        write_time(&mut out, t).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "06/Dec/2023:02:02:47 +0000");
    }

    #[test]
    fn t_log_combined() {
        let access = Shared::default();
        let error = Shared::default();
        let logs = Mutex::new(Logs {
            access_log: Box::new(access.clone()),
            error_log: Box::new(error.clone()),
        });
        let request = Request::fake_http(
            "GET", "/pages/HomePage.html?name=Alice",
            vec![("User-Agent".into(), "test".into())], vec![]);

        let r = log_combined(&request, &logs, || Ok(Response::text("hello")));
        assert_eq!(r.status_code, 200);
        let line = access.contents();
        assert!(line.starts_with("127.0.0.1 - - ["), "{line}");
        assert!(line.contains("] \"GET /pages/HomePage.html?name=Alice HTTP/1.1\" 200 5 \"-\" \"test\" "),
                "{line}");

        let r = log_combined(&request, &logs, || Err(anyhow!("it <broke>")));
        assert_eq!(r.status_code, 500);
        assert!(error.contents().contains("[error] [client 127.0.0.1]"));
        assert!(error.contents().contains(": it <broke>\n"));
    }
}
