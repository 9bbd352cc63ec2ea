use super::InstantiateErrorKind;
use crate::any::TypeInfo;

#[derive(thiserror::Error, Debug)]
pub enum CloseErrorKind {
    #[error("Finalizer of `{type_info}` failed: {source}")]
    Finalizer {
        type_info: TypeInfo,
        #[source]
        source: InstantiateErrorKind,
    },
    #[error("Finalizer of `{type_info}` is asynchronous and can't be called on synchronous close")]
    AsyncFinalizerInSyncClose { type_info: TypeInfo },
    #[error("Shutdown of extension `{extension}` failed: {source}")]
    Shutdown {
        extension: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum StartErrorKind {
    #[error("Startup of extension `{extension}` failed: {source}")]
    Startup {
        extension: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("Container is already started")]
    AlreadyStarted,
}
