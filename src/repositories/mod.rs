pub(crate) mod essays;
