pub(crate) mod collect;
pub(crate) mod limits;
pub(crate) mod meta;
pub(crate) mod shared;
pub(crate) mod tables;
