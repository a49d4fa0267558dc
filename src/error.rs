use ::serde_json::Value;

pub type Result<T, E = Error> = ::std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("paginator query must be supplied at this point")]
    InvalidState,
    #[error("some listener must process the \"{0}\" event")]
    UnhandledEvent(&'static str),

    #[error("query parameter `{0}` is not bound")]
    MissingParameter(String),
    #[error("hint `{hint}` is required by the {walker} tree walker")]
    MissingHint { walker: &'static str, hint: &'static str },
    #[error("unknown entity `{0}`")]
    UnknownEntity(String),
    #[error("unknown identification variable `{0}`")]
    UnknownAlias(String),
    #[error("unsupported statement: {0}")]
    Unsupported(String),
    #[error("count query returned a non numeric value: {0}")]
    UnexpectedCount(Value),
    #[error("failed to hydrate result: {0}")]
    Hydration(#[from] ::serde_json::Error),
    #[error(transparent)]
    Backend(Box<dyn ::std::error::Error + Send + Sync>),

    #[error("no route available to generate a link")]
    MissingRoute,
    #[error("route `{0}` does not exist")]
    RouteNotFound(String),
    #[error("route `{route}` requires parameter `{parameter}`")]
    MissingRouteParameter { route: String, parameter: String },
    #[error("template rendering failed: {0}")]
    Render(String),

    #[error("invalid configuration value for {key}: {message}")]
    Config { key: &'static str, message: String },
}

impl Error {
    pub fn backend<E: ::std::error::Error + Send + Sync + 'static>(error: E) -> Self {
        Self::Backend(Box::new(error))
    }
}
