//! Build script for k1-firmware
//!
//! - Validates device.toml at compile time
//! - Generates memory.x from the [flash] and [ram] sections
//! - Generates device_config.rs from device.toml

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Device type names, indexed by their on-flash code
const DEVICE_TYPES: [&str; 23] = [
    "undefined",
    "smoke_detector",
    "heat_detector",
    "smoke_heat_detector",
    "address_label_2",
    "address_label_6",
    "valve_control_module",
    "relay_module_2r",
    "relay_module_6r",
    "short_circuit_isolator",
    "sounder_beacon",
    "exit_sign",
    "fire_suppression_start",
    "smoke_exhaust_start",
    "manual_call_point",
    "fan_control_cabinet",
    "valve_actuator_cabinet",
    "address_module_5",
    "relay_module_2",
    "relay_module_6",
    "magnetic_contact",
    "power_supply",
    "motion_sensor",
];

const MAX_ITEMS: i64 = 8;
const STALL_PERIOD_MS: i64 = 500;

/// Validated device profile
struct DeviceConfig {
    device_type: u8,
    items: usize,
    flash_origin: u32,
    firmware_size: u32,
    ram_origin: u32,
    ram_size: u32,
    page_size: u32,
    main: u32,
    spare: u32,
    short_push_ms: u32,
    long_push_ms: u32,
    release_ms: u32,
    control_period_ms: u32,
    address_pin: String,
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    let config = validate_config();
    setup_linker(&config);
    generate_config(&config);
}

/// Write memory.x and set up linker search paths for it
///
/// FLASH covers only `firmware_size`, which validation keeps clear of the
/// settings pages.
fn setup_linker(config: &DeviceConfig) {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    let memory_x = format!(
        "/* Generated by build.rs from device.toml */\n\
         MEMORY\n\
         {{\n\
         \x20 FLASH : ORIGIN = {:#010x}, LENGTH = {}K\n\
         \x20 RAM   : ORIGIN = {:#010x}, LENGTH = {}K\n\
         }}\n",
        config.flash_origin,
        config.firmware_size / 1024,
        config.ram_origin,
        config.ram_size / 1024,
    );
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x.as_bytes()).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
}

/// Validate device.toml at compile time
fn validate_config() -> DeviceConfig {
    println!("cargo:rerun-if-changed=device.toml");

    let config_path = Path::new("device.toml");

    if !config_path.exists() {
        fail(
            "device.toml not found!",
            &[
                "The firmware requires a device.toml profile.".to_string(),
                "Please create one in the k1-firmware directory.".to_string(),
            ],
        );
    }

    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => fail("Failed to read device.toml", &[e.to_string()]),
    };

    let config: toml::Table = match content.parse() {
        Ok(table) => table,
        Err(e) => {
            let lines: Vec<String> = e.to_string().lines().map(str::to_string).collect();
            fail("Invalid TOML syntax in device.toml", &lines)
        }
    };

    let mut errors = Vec::new();

    for section in ["device", "flash", "ram", "settings", "buttons"] {
        if !config.get(section).is_some_and(toml::Value::is_table) {
            errors.push(format!("Missing [{}] section", section));
        }
    }
    if !errors.is_empty() {
        fail("Missing required sections in device.toml", &errors);
    }

    let device_type = match config["device"].get("type") {
        Some(toml::Value::String(name)) => {
            match DEVICE_TYPES.iter().position(|known| known == name) {
                Some(0) => {
                    errors.push("[device] type cannot be 'undefined'".to_string());
                    0
                }
                Some(code) => code as u8,
                None => {
                    errors.push(format!("[device] unknown type '{}'", name));
                    0
                }
            }
        }
        _ => {
            errors.push("[device] missing 'type' (string)".to_string());
            0
        }
    };

    let items = integer(&config, "device", "items", &mut errors);
    if !(1..=MAX_ITEMS).contains(&items) {
        errors.push(format!("[device] items must be 1-{}", MAX_ITEMS));
    }

    let origin = integer(&config, "flash", "origin", &mut errors);
    let size = integer(&config, "flash", "size", &mut errors);
    let page_size = integer(&config, "flash", "page_size", &mut errors);
    let firmware_size = integer(&config, "flash", "firmware_size", &mut errors);
    let main = integer(&config, "settings", "main", &mut errors);
    let spare = integer(&config, "settings", "spare", &mut errors);

    let ram_origin = integer(&config, "ram", "origin", &mut errors);
    let ram_size = integer(&config, "ram", "size", &mut errors);

    if firmware_size <= 0 || firmware_size % 1024 != 0 || firmware_size > size {
        errors.push("[flash] firmware_size must be whole KiB within flash".to_string());
    }
    if ram_size <= 0 || ram_size % 1024 != 0 {
        errors.push("[ram] size must be a positive whole number of KiB".to_string());
    }

    if page_size <= 0 || page_size % 4 != 0 {
        errors.push("[flash] page_size must be a positive multiple of 4".to_string());
    } else {
        let image_start = origin;
        let image_end = origin + firmware_size;
        let flash_end = origin + size;
        for (name, address) in [("main", main), ("spare", spare)] {
            if address % page_size != 0 {
                errors.push(format!("[settings] {} is not page aligned", name));
            }
            if address < origin || address + page_size > flash_end {
                errors.push(format!("[settings] {} is outside flash", name));
            }
            if address < image_end && address + page_size > image_start {
                errors.push(format!("[settings] {} overlaps the firmware image", name));
            }
        }
        if (main - spare).abs() < page_size {
            errors.push("[settings] main and spare share a page".to_string());
        }
    }

    let short_push_ms = integer(&config, "buttons", "short_push_ms", &mut errors);
    let long_push_ms = integer(&config, "buttons", "long_push_ms", &mut errors);
    let release_ms = integer(&config, "buttons", "release_ms", &mut errors);
    let control_period_ms = integer(&config, "buttons", "control_period_ms", &mut errors);

    if short_push_ms <= 0 || long_push_ms <= short_push_ms {
        errors.push("[buttons] need 0 < short_push_ms < long_push_ms".to_string());
    }
    if release_ms <= 0 {
        errors.push("[buttons] release_ms must be positive".to_string());
    }
    if control_period_ms <= 0 || control_period_ms >= STALL_PERIOD_MS {
        errors.push(format!(
            "[buttons] control_period_ms must be 1-{}",
            STALL_PERIOD_MS - 1
        ));
    }

    let address_pin = match config["buttons"].get("address_pin") {
        Some(toml::Value::String(pin)) => {
            if !is_gpio_pin(pin) {
                errors.push(format!("[buttons] address_pin '{}' is not a pin name like PB13", pin));
            }
            pin.clone()
        }
        _ => {
            errors.push("[buttons] missing 'address_pin' (string)".to_string());
            String::new()
        }
    };

    if !errors.is_empty() {
        fail("Invalid device configuration", &errors);
    }

    println!("cargo:warning=device.toml validated successfully");

    DeviceConfig {
        device_type,
        items: items as usize,
        flash_origin: origin as u32,
        firmware_size: firmware_size as u32,
        ram_origin: ram_origin as u32,
        ram_size: ram_size as u32,
        page_size: page_size as u32,
        main: main as u32,
        spare: spare as u32,
        short_push_ms: short_push_ms as u32,
        long_push_ms: long_push_ms as u32,
        release_ms: release_ms as u32,
        control_period_ms: control_period_ms as u32,
        address_pin,
    }
}

/// Pin names on a 48-pin STM32F103: port A-D, line 0-15
fn is_gpio_pin(name: &str) -> bool {
    let mut chars = name.chars();
    let prefix_ok = chars.next() == Some('P') && matches!(chars.next(), Some('A'..='D'));
    let line = chars.as_str();
    prefix_ok
        && !line.is_empty()
        && line.chars().all(|c| c.is_ascii_digit())
        && !(line.len() > 1 && line.starts_with('0'))
        && line.parse::<u8>().is_ok_and(|n| n <= 15)
}

/// Look up a required integer field, recording an error when absent
fn integer(config: &toml::Table, section: &str, key: &str, errors: &mut Vec<String>) -> i64 {
    match config[section].get(key) {
        Some(toml::Value::Integer(value)) => *value,
        _ => {
            errors.push(format!("[{}] missing '{}' (integer)", section, key));
            0
        }
    }
}

/// Write device_config.rs into OUT_DIR
fn generate_config(config: &DeviceConfig) {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let region_start = config.main.min(config.spare);
    let region_end = config.main.max(config.spare) + config.page_size;

    let source = format!(
        "// Generated by build.rs from device.toml\n\
         \n\
         pub const DEVICE_TYPE: u8 = {};\n\
         pub const ITEMS: usize = {};\n\
         pub const FLASH_PAGE_SIZE: u32 = {};\n\
         pub const SETTINGS_MAIN: u32 = {:#010x};\n\
         pub const SETTINGS_SPARE: u32 = {:#010x};\n\
         pub const SETTINGS_REGION: core::ops::Range<u32> = {:#010x}..{:#010x};\n\
         pub const SHORT_PUSH_MS: u32 = {};\n\
         pub const LONG_PUSH_MS: u32 = {};\n\
         pub const RELEASE_MS: u32 = {};\n\
         pub const CONTROL_PERIOD_MS: u32 = {};\n\
         \n\
         /// Take the address button pin out of the peripherals\n\
         macro_rules! address_button_pin {{\n\
         \x20   ($p:expr) => {{\n\
         \x20       $p.{}\n\
         \x20   }};\n\
         }}\n",
        config.device_type,
        config.items,
        config.page_size,
        config.main,
        config.spare,
        region_start,
        region_end,
        config.short_push_ms,
        config.long_push_ms,
        config.release_ms,
        config.control_period_ms,
        config.address_pin,
    );

    let mut f = File::create(out_dir.join("device_config.rs")).unwrap();
    f.write_all(source.as_bytes()).unwrap();
}

/// Abort the build with a boxed diagnostic
fn fail(title: &str, lines: &[String]) -> ! {
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title,
        lines
            .iter()
            .map(|line| {
                let truncated = if line.chars().count() > 62 {
                    format!("{}...", line.chars().take(59).collect::<String>())
                } else {
                    line.clone()
                };
                format!("║  • {:<62} ║", truncated)
            })
            .collect::<Vec<_>>()
            .join("\n")
    );
}
