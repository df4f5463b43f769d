pub mod module_manager;
pub mod osc_module;
pub mod output_module;
pub mod playback_module;
pub mod traits;

// Re-export for convenience
pub use module_manager::ModuleManager;
pub use osc_module::OscModule;
pub use output_module::OutputModule;
pub use playback_module::PlaybackModule;
pub use traits::{AsyncModule, ModuleEvent, ModuleId, ModuleMessage};
