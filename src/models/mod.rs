pub mod action;
pub mod collection;
pub mod task_result;

pub use action::*;
pub use collection::*;
pub use task_result::*;

/// 设备的开关型参数使用 "on"/"off" 字符串
pub fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}

/// 首字母大写、其余小写，用于把设备状态（如 "completed"）转成提示语
pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
