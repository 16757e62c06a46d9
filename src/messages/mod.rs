//! ignition 风格的消息类型，以及发布时使用的编码

pub mod builders;

use serde::{Deserialize, Serialize};
use std::fmt;

/// 可以在 topic 上发布的消息
pub trait Message: Serialize + Send + 'static {
    /// 申明 topic 时使用的类型名
    const TYPE_NAME: &'static str;
}

/// 将消息编码为发布用的字节
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, bincode::Error> {
    bincode::serialize(message)
}

/// 支持的消息种类，用于配置文件中的 `kind`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Header,
    String,
    Quaternion,
    #[serde(alias = "vector3")]
    Vector3d,
    Image,
    Imu,
    #[serde(alias = "laserscan")]
    LaserScan,
    #[serde(alias = "magnetic")]
    Magnetometer,
}

impl MessageKind {
    pub const ALL: [MessageKind; 8] = [
        MessageKind::Header,
        MessageKind::String,
        MessageKind::Quaternion,
        MessageKind::Vector3d,
        MessageKind::Image,
        MessageKind::Imu,
        MessageKind::LaserScan,
        MessageKind::Magnetometer,
    ];

    /// 对应消息的类型名
    pub fn type_name(&self) -> &'static str {
        match self {
            MessageKind::Header => Header::TYPE_NAME,
            MessageKind::String => StringMsg::TYPE_NAME,
            MessageKind::Quaternion => Quaternion::TYPE_NAME,
            MessageKind::Vector3d => Vector3d::TYPE_NAME,
            MessageKind::Image => Image::TYPE_NAME,
            MessageKind::Imu => Imu::TYPE_NAME,
            MessageKind::LaserScan => LaserScan::TYPE_NAME,
            MessageKind::Magnetometer => Magnetometer::TYPE_NAME,
        }
    }

    /// 默认的 topic 名
    pub fn default_topic(&self) -> &'static str {
        match self {
            MessageKind::Header => "header",
            MessageKind::String => "string",
            MessageKind::Quaternion => "quaternion",
            MessageKind::Vector3d => "vector3",
            MessageKind::Image => "image",
            MessageKind::Imu => "imu",
            MessageKind::LaserScan => "laserscan",
            MessageKind::Magnetometer => "magnetic",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Time {
    pub sec: i64,
    pub nsec: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub stamp: Time,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StringMsg {
    pub header: Option<Header>,
    pub data: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub header: Option<Header>,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3d {
    pub header: Option<Header>,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// 像素格式，取值与 ignition common 的 PixelFormatType 一致
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum PixelFormat {
    #[default]
    Unknown = 0,
    LInt8 = 1,
    LInt16 = 2,
    RgbInt8 = 3,
    RgbaInt8 = 4,
    BgraInt8 = 5,
    RgbInt16 = 6,
    RgbInt32 = 7,
    BgrInt8 = 8,
}

impl PixelFormat {
    /// 每个像素占用的字节数，未知格式返回 0
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            PixelFormat::Unknown => 0,
            PixelFormat::LInt8 => 1,
            PixelFormat::LInt16 => 2,
            PixelFormat::RgbInt8 | PixelFormat::BgrInt8 => 3,
            PixelFormat::RgbaInt8 | PixelFormat::BgraInt8 => 4,
            PixelFormat::RgbInt16 => 6,
            PixelFormat::RgbInt32 => 12,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub header: Option<Header>,
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    /// 每行的字节数
    pub step: u32,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Imu {
    pub header: Option<Header>,
    pub entity_name: String,
    pub orientation: Option<Quaternion>,
    pub angular_velocity: Option<Vector3d>,
    pub linear_acceleration: Option<Vector3d>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LaserScan {
    pub header: Option<Header>,
    pub frame: String,
    pub angle_min: f64,
    pub angle_max: f64,
    pub angle_step: f64,
    pub range_min: f64,
    pub range_max: f64,
    pub count: u32,
    pub vertical_angle_min: f64,
    pub vertical_angle_max: f64,
    pub vertical_angle_step: f64,
    pub vertical_count: u32,
    pub ranges: Vec<f64>,
    pub intensities: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Magnetometer {
    pub header: Option<Header>,
    pub field_tesla: Option<Vector3d>,
}

/// 为消息实现 Message trait
macro_rules! impl_message {
    ($($name:ident => $type_name:literal),* $(,)?) => {
        $(
            impl Message for $name {
                const TYPE_NAME: &'static str = $type_name;
            }
        )*
    };
}

impl_message! {
    Header => "ignition.msgs.Header",
    StringMsg => "ignition.msgs.StringMsg",
    Quaternion => "ignition.msgs.Quaternion",
    Vector3d => "ignition.msgs.Vector3d",
    Image => "ignition.msgs.Image",
    Imu => "ignition.msgs.IMU",
    LaserScan => "ignition.msgs.LaserScan",
    Magnetometer => "ignition.msgs.Magnetometer",
}
