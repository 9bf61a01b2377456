pub(crate) mod carts;
pub(crate) mod lines;

pub(crate) use carts::PgCartsRepository;
pub(crate) use lines::PgCartLinesRepository;
