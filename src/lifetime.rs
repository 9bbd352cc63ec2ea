use std::fmt::{self, Display, Formatter};

/// How long a provided instance lives.
///
/// Ordered from the narrowest to the widest lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Lifetime {
    /// A new instance on every resolution, never cached.
    Transient,
    /// One instance per resolution context.
    Scoped,
    /// One instance per container, shared between all contexts.
    Singleton,
}

impl Lifetime {
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Lifetime::Transient => "transient",
            Lifetime::Scoped => "scoped",
            Lifetime::Singleton => "singleton",
        }
    }

    #[inline]
    #[must_use]
    pub const fn priority(&self) -> u8 {
        *self as u8
    }

    #[inline]
    #[must_use]
    pub const fn is_cached(&self) -> bool {
        !matches!(self, Lifetime::Transient)
    }
}

impl Display for Lifetime {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::Lifetime::*;

    #[test]
    fn test_ordering() {
        assert!(Transient < Scoped);
        assert!(Scoped < Singleton);
        assert_eq!(Singleton.priority(), 2);
        assert!(!Transient.is_cached());
    }
}
