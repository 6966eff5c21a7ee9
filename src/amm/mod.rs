pub mod pair;
pub mod route;

pub use pair::{AmmError, Pair};
pub use route::{RankedRoute, Route, RouteError, RouteFinder};
