/// Error returned by user factories and finalizers.
///
/// The wrapped [`anyhow::Error`] is never rewritten by the container,
/// so callers can [`anyhow::Error::downcast_ref`] it back to their own error type.
#[derive(thiserror::Error, Debug)]
pub enum InstantiateErrorKind {
    #[error(transparent)]
    Custom(#[from] anyhow::Error),
}

impl InstantiateErrorKind {
    #[inline]
    #[must_use]
    pub fn custom<E>(err: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        Self::Custom(err.into())
    }

    #[inline]
    #[must_use]
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: core::fmt::Display + core::fmt::Debug + Send + Sync + 'static,
    {
        match self {
            Self::Custom(err) => err.downcast_ref(),
        }
    }
}
