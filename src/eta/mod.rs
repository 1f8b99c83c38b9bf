pub mod client;
pub mod error;
pub mod resolver;
pub mod types;

pub use client::{DistanceMatrixClient, RouteProvider};
pub use error::EtaError;
pub use resolver::EtaResolver;
pub use types::{DistanceMatrixRequest, DistanceMatrixResponse, MatrixElement, MatrixRow};
