//! Prism engine crate.
//!
//! A small real-time 3D pipeline on wgpu: effects compile WGSL programs and
//! derive vertex layouts, meshes own GPU buffers bound to one effect, and the
//! renderer owns the device, swap chain and depth buffer and draws opaque
//! meshes before alpha-blended ones.

pub mod camera;
pub mod core;
pub mod device;
pub mod effect;
pub mod input;
pub mod logging;
pub mod mesh;
pub mod renderer;
pub mod texture;
pub mod time;
pub mod window;
