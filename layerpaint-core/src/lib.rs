pub mod blend;
pub mod commands;
pub mod config;
pub mod history;
pub mod id;
pub mod io;
pub mod queue;
pub mod raster;
pub mod render;
pub mod state;
pub mod util;

use id::UniqueID;
