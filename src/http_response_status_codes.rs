//! The HTTP status codes this server answers with.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpResponseStatusCode {
    OK200,
    NotModified304,
    BadRequest400,
    Unauthorized401,
    NotFound404,
    MethodNotAllowed405,
    InternalServerError500,
}

impl HttpResponseStatusCode {
    pub fn code(self) -> u16 {
        use HttpResponseStatusCode::*;
        match self {
            OK200 => 200,
            NotModified304 => 304,
            BadRequest400 => 400,
            Unauthorized401 => 401,
            NotFound404 => 404,
            MethodNotAllowed405 => 405,
            InternalServerError500 => 500,
        }
    }

    pub fn title(self) -> &'static str {
        use HttpResponseStatusCode::*;
        match self {
            OK200 => "OK",
            NotModified304 => "Not Modified",
            BadRequest400 => "Bad Request",
            Unauthorized401 => "Unauthorized",
            NotFound404 => "Not Found",
            MethodNotAllowed405 => "Method Not Allowed",
            InternalServerError500 => "Internal Server Error",
        }
    }

    /// Explanation for error pages.
    pub fn desc(self) -> &'static str {
        use HttpResponseStatusCode::*;
        match self {
            OK200 => "The request succeeded.",
            NotModified304 => "The resource has not changed since the given time or version.",
            BadRequest400 => "The request could not be understood.",
            Unauthorized401 => "Authentication is required to access this resource.",
            NotFound404 => "The requested resource could not be found.",
            MethodNotAllowed405 => "The request method is not supported for this resource.",
            InternalServerError500 => "The server encountered an error processing the request.",
        }
    }
}
