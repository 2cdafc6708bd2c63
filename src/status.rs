//! HTTP status codes and the fixed reason-phrase table.
//!
//! Everything the engine sets internally goes through [`Status`], so an
//! unmapped code can never originate inside wren. Handlers may still assign
//! a raw `u16` to [`Response::code`](crate::Response); such a code is checked
//! against this table when the response is emitted.
//!
//! ```rust
//! use wren::Status;
//!
//! assert_eq!(Status::MovedPermanently.code(), 301);
//! assert_eq!(Status::from_code(404), Some(Status::NotFound));
//! assert_eq!(Status::Created.line(), "201 Created");
//! ```

/// A status code with a known reason phrase.
#[allow(clippy::enum_variant_names)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u16)]
pub enum Status {
    // ── 1xx ───────────────────────────────────────────────────────────────────
    Continue                      = 100,
    SwitchingProtocols            = 101,

    // ── 2xx ───────────────────────────────────────────────────────────────────
    Ok                            = 200,
    Created                       = 201,
    Accepted                      = 202,
    NonAuthoritativeInformation   = 203,
    NoContent                     = 204,
    ResetContent                  = 205,
    PartialContent                = 206,

    // ── 3xx ───────────────────────────────────────────────────────────────────
    MultipleChoices               = 300,
    MovedPermanently              = 301,
    Found                         = 302,
    SeeOther                      = 303,
    NotModified                   = 304,
    TemporaryRedirect             = 307,
    PermanentRedirect             = 308,

    // ── 4xx ───────────────────────────────────────────────────────────────────
    BadRequest                    = 400,
    Unauthorized                  = 401,
    PaymentRequired               = 402,
    Forbidden                     = 403,
    NotFound                      = 404,
    MethodNotAllowed              = 405,
    NotAcceptable                 = 406,
    RequestTimeout                = 408,
    Conflict                      = 409,
    Gone                          = 410,
    LengthRequired                = 411,
    PreconditionFailed            = 412,
    ContentTooLarge               = 413,
    UriTooLong                    = 414,
    UnsupportedMediaType          = 415,
    UnprocessableContent          = 422,
    TooManyRequests               = 429,

    // ── 5xx ───────────────────────────────────────────────────────────────────
    InternalServerError           = 500,
    NotImplemented                = 501,
    BadGateway                    = 502,
    ServiceUnavailable            = 503,
    GatewayTimeout                = 504,
}

impl Status {
    /// The numeric code.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Looks a raw code up in the table. `None` means the code is unmapped.
    pub fn from_code(code: u16) -> Option<Self> {
        let status = match code {
            100 => Self::Continue,
            101 => Self::SwitchingProtocols,
            200 => Self::Ok,
            201 => Self::Created,
            202 => Self::Accepted,
            203 => Self::NonAuthoritativeInformation,
            204 => Self::NoContent,
            205 => Self::ResetContent,
            206 => Self::PartialContent,
            300 => Self::MultipleChoices,
            301 => Self::MovedPermanently,
            302 => Self::Found,
            303 => Self::SeeOther,
            304 => Self::NotModified,
            307 => Self::TemporaryRedirect,
            308 => Self::PermanentRedirect,
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            402 => Self::PaymentRequired,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            405 => Self::MethodNotAllowed,
            406 => Self::NotAcceptable,
            408 => Self::RequestTimeout,
            409 => Self::Conflict,
            410 => Self::Gone,
            411 => Self::LengthRequired,
            412 => Self::PreconditionFailed,
            413 => Self::ContentTooLarge,
            414 => Self::UriTooLong,
            415 => Self::UnsupportedMediaType,
            422 => Self::UnprocessableContent,
            429 => Self::TooManyRequests,
            500 => Self::InternalServerError,
            501 => Self::NotImplemented,
            502 => Self::BadGateway,
            503 => Self::ServiceUnavailable,
            504 => Self::GatewayTimeout,
            _   => return None,
        };
        Some(status)
    }

    /// The reason phrase, e.g. `"Moved Permanently"`.
    pub fn reason(self) -> &'static str {
        match self {
            Self::Continue                    => "Continue",
            Self::SwitchingProtocols          => "Switching Protocols",
            Self::Ok                          => "OK",
            Self::Created                     => "Created",
            Self::Accepted                    => "Accepted",
            Self::NonAuthoritativeInformation => "Non-Authoritative Information",
            Self::NoContent                   => "No Content",
            Self::ResetContent                => "Reset Content",
            Self::PartialContent              => "Partial Content",
            Self::MultipleChoices             => "Multiple Choices",
            Self::MovedPermanently            => "Moved Permanently",
            Self::Found                       => "Found",
            Self::SeeOther                    => "See Other",
            Self::NotModified                 => "Not Modified",
            Self::TemporaryRedirect           => "Temporary Redirect",
            Self::PermanentRedirect           => "Permanent Redirect",
            Self::BadRequest                  => "Bad Request",
            Self::Unauthorized                => "Unauthorized",
            Self::PaymentRequired             => "Payment Required",
            Self::Forbidden                   => "Forbidden",
            Self::NotFound                    => "Not Found",
            Self::MethodNotAllowed            => "Method Not Allowed",
            Self::NotAcceptable               => "Not Acceptable",
            Self::RequestTimeout              => "Request Timeout",
            Self::Conflict                    => "Conflict",
            Self::Gone                        => "Gone",
            Self::LengthRequired              => "Length Required",
            Self::PreconditionFailed          => "Precondition Failed",
            Self::ContentTooLarge             => "Content Too Large",
            Self::UriTooLong                  => "URI Too Long",
            Self::UnsupportedMediaType        => "Unsupported Media Type",
            Self::UnprocessableContent        => "Unprocessable Content",
            Self::TooManyRequests             => "Too Many Requests",
            Self::InternalServerError         => "Internal Server Error",
            Self::NotImplemented              => "Not Implemented",
            Self::BadGateway                  => "Bad Gateway",
            Self::ServiceUnavailable          => "Service Unavailable",
            Self::GatewayTimeout              => "Gateway Timeout",
        }
    }

    /// Status line text, e.g. `"404 Not Found"`.
    pub fn line(self) -> String {
        format!("{} {}", self.code(), self.reason())
    }
}

impl From<Status> for u16 {
    fn from(s: Status) -> u16 {
        s.code()
    }
}
