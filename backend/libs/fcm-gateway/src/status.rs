use std::fmt;

/// Named failure for every HTTP status the client treats as an error.
///
/// Anything not listed here (all 1xx/2xx/3xx plus unlisted 4xx/5xx codes)
/// is passed through to the caller as a normal response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    PaymentRequired,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    NotAcceptable,
    ProxyAuthenticationRequired,
    RequestTimeout,
    Conflict,
    Gone,
    LengthRequired,
    PreconditionFailed,
    PayloadTooLarge,
    UriTooLong,
    UnsupportedMediaType,
    RangeNotSatisfiable,
    ExpectationFailed,
    ImATeapot,
    MisdirectedRequest,
    UnprocessableEntity,
    Locked,
    FailedDependency,
    UpgradeRequired,
    PreconditionRequired,
    TooManyRequests,
    RequestHeaderFieldsTooLarge,
    UnavailableForLegalReasons,
    InternalServerError,
    NotImplemented,
    BadGateway,
    ServiceUnavailable,
    GatewayTimeout,
    HttpVersionNotSupported,
    VariantAlsoNegotiates,
    InsufficientStorage,
    LoopDetected,
    NotExtended,
    NetworkAuthenticationRequired,
}

const STATUS_MAPPING: &[(u16, ErrorKind)] = &[
    (400, ErrorKind::BadRequest),
    (401, ErrorKind::Unauthorized),
    (402, ErrorKind::PaymentRequired),
    (403, ErrorKind::Forbidden),
    (404, ErrorKind::NotFound),
    (405, ErrorKind::MethodNotAllowed),
    (406, ErrorKind::NotAcceptable),
    (407, ErrorKind::ProxyAuthenticationRequired),
    (408, ErrorKind::RequestTimeout),
    (409, ErrorKind::Conflict),
    (410, ErrorKind::Gone),
    (411, ErrorKind::LengthRequired),
    (412, ErrorKind::PreconditionFailed),
    (413, ErrorKind::PayloadTooLarge),
    (414, ErrorKind::UriTooLong),
    (415, ErrorKind::UnsupportedMediaType),
    (416, ErrorKind::RangeNotSatisfiable),
    (417, ErrorKind::ExpectationFailed),
    (418, ErrorKind::ImATeapot),
    (421, ErrorKind::MisdirectedRequest),
    (422, ErrorKind::UnprocessableEntity),
    (423, ErrorKind::Locked),
    (424, ErrorKind::FailedDependency),
    (426, ErrorKind::UpgradeRequired),
    (428, ErrorKind::PreconditionRequired),
    (429, ErrorKind::TooManyRequests),
    (431, ErrorKind::RequestHeaderFieldsTooLarge),
    (451, ErrorKind::UnavailableForLegalReasons),
    (500, ErrorKind::InternalServerError),
    (501, ErrorKind::NotImplemented),
    (502, ErrorKind::BadGateway),
    (503, ErrorKind::ServiceUnavailable),
    (504, ErrorKind::GatewayTimeout),
    (505, ErrorKind::HttpVersionNotSupported),
    (506, ErrorKind::VariantAlsoNegotiates),
    (507, ErrorKind::InsufficientStorage),
    (508, ErrorKind::LoopDetected),
    (510, ErrorKind::NotExtended),
    (511, ErrorKind::NetworkAuthenticationRequired),
];

/// Map an HTTP status code onto an error kind.
///
/// Returns `None` for codes that should not fail the call.
pub fn classify(status: u16) -> Option<ErrorKind> {
    STATUS_MAPPING
        .iter()
        .find(|(code, _)| *code == status)
        .map(|(_, kind)| *kind)
}

impl ErrorKind {
    /// The status code this kind was mapped from
    pub fn status(&self) -> u16 {
        STATUS_MAPPING
            .iter()
            .find(|(_, kind)| kind == self)
            .map(|(code, _)| *code)
            .unwrap_or(500)
    }

    /// 4xx: caller-correctable (bad payload, auth failure, rate limit)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status())
    }

    /// 5xx: provider-side, the caller may retry with backoff
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status())
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
