use crate::any::TypeInfo;

#[derive(thiserror::Error, Debug)]
pub enum RegisterErrorKind {
    #[error("Provider for `{type_info}` with implementation `{implementation}` is already registered")]
    DuplicateProvider { type_info: TypeInfo, implementation: TypeInfo },
    #[error("Provider for `{type_info}` is overridden more than once in a single override")]
    DuplicateOverride { type_info: TypeInfo },
    #[error("Dependency extractor of provider for `{type_info}` disagrees with the arguments or the output of its factory")]
    ExtractorMismatch { type_info: TypeInfo },
    #[error("Generic family `{family}` is already registered")]
    DuplicateGenericFamily { family: TypeInfo },
}
