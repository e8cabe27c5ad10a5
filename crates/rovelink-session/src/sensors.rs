/// Battery and range sensors.
pub trait Sensors: Send + Sync {
    /// Battery level, 0-255.
    fn battery_level(&self) -> u8;

    /// Distance to the nearest obstacle ahead, in centimetres.
    fn forward_distance(&self) -> u8;
}
