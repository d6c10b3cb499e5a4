//! Mathematical utilities and data structures

pub mod aabb;
pub mod frustum;
pub mod sphere;

pub use aabb::Aabb;
pub use frustum::{Containment, Frustum, Plane};
pub use sphere::BoundingSphere;
