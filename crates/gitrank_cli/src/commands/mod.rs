pub(crate) mod archive;
pub(crate) mod deltas;
pub(crate) mod migrate;
pub(crate) mod run;
