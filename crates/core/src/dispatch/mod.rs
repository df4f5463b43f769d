pub mod artnet_sink;
pub mod sink;
