//! 构造各类示例消息
//! 嵌入的子消息(header 等)都是值拷贝，之后修改原消息不会影响已构造的消息

use super::{
    Header, Image, Imu, LaserScan, Magnetometer, PixelFormat, Quaternion, StringMsg, Time,
    Vector3d,
};

/// 激光扫描默认的采样点数
pub const DEFAULT_LASER_READINGS: u32 = 100;

pub fn header() -> Header {
    Header {
        stamp: Time { sec: 2, nsec: 3 },
    }
}

pub fn string() -> StringMsg {
    StringMsg {
        header: None,
        data: "string".to_string(),
    }
}

pub fn quaternion() -> Quaternion {
    Quaternion {
        header: None,
        x: 1.0,
        y: 2.0,
        z: 3.0,
        w: 4.0,
    }
}

pub fn vector3d() -> Vector3d {
    Vector3d {
        header: None,
        x: 1.0,
        y: 2.0,
        z: 3.0,
    }
}

/// 320x240 的 RGB 图像，像素数据全部为 `'0'`
pub fn image(header: &Header) -> Image {
    let width = 320;
    let height = 240;
    let pixel_format = PixelFormat::RgbInt8;
    let step = width * pixel_format.bytes_per_pixel();
    Image {
        header: Some(header.clone()),
        width,
        height,
        pixel_format,
        step,
        data: vec![b'0'; (height * step) as usize],
    }
}

pub fn imu(header: &Header, orientation: &Quaternion, vector: &Vector3d) -> Imu {
    Imu {
        header: Some(header.clone()),
        entity_name: String::new(),
        orientation: Some(orientation.clone()),
        angular_velocity: Some(vector.clone()),
        linear_acceleration: Some(vector.clone()),
    }
}

/// 水平方向 `readings` 个采样点，距离全为 0，强度全为 1
#[allow(clippy::approx_constant)]
pub fn laser_scan(header: &Header, readings: u32) -> LaserScan {
    let mut scan = LaserScan {
        header: Some(header.clone()),
        frame: String::new(),
        angle_min: -1.57,
        angle_max: 1.57,
        angle_step: 3.14 / f64::from(readings),
        range_min: 1.0,
        range_max: 2.0,
        count: readings,
        vertical_angle_min: 0.0,
        vertical_angle_max: 0.0,
        vertical_angle_step: 0.0,
        vertical_count: 0,
        ranges: Vec::with_capacity(readings as usize),
        intensities: Vec::with_capacity(readings as usize),
    };
    for _ in 0..scan.count {
        scan.ranges.push(0.0);
        scan.intensities.push(1.0);
    }
    scan
}

pub fn magnetometer(header: &Header, field: &Vector3d) -> Magnetometer {
    Magnetometer {
        header: Some(header.clone()),
        field_tesla: Some(field.clone()),
    }
}
