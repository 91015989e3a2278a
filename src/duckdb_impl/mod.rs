pub(crate) mod scalar;
pub(crate) mod string;
