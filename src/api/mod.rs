pub(crate) mod errors;
pub(crate) mod grade;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod router;
pub(crate) mod validation;
