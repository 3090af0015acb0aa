//! Build script for mbport-hal-tinyavr
//!
//! Validates port.toml and generates the board constants the firmware is
//! built with. Derived values (baud divisor, timer counts per 50µs) are
//! checked here so an unreachable configuration fails the build instead of
//! misbehaving on the wire.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const MAIN_PRESCALERS: [i64; 12] = [1, 2, 4, 6, 8, 10, 12, 16, 24, 32, 48, 64];
const TIMER_PRESCALERS: [(i64, &str); 8] = [
    (1, "Div1"),
    (2, "Div2"),
    (4, "Div4"),
    (8, "Div8"),
    (16, "Div16"),
    (64, "Div64"),
    (256, "Div256"),
    (1024, "Div1024"),
];

struct BoardConfig {
    instance: i64,
    baud_rate: i64,
    data_bits: i64,
    parity: String,
    cpu_hz: i64,
    main_prescaler: i64,
    timer_prescaler: i64,
    node_address: i64,
}

fn main() {
    println!("cargo:rerun-if-changed=port.toml");
    println!("cargo:rerun-if-changed=build.rs");

    let config_path = Path::new("port.toml");
    if !config_path.exists() {
        fail(&["port.toml not found", "Create one next to this crate's Cargo.toml."]);
    }

    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => fail(&["Failed to read port.toml", &e.to_string()]),
    };

    let value: toml::Value = match toml::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            let msg = e.to_string();
            let mut lines = vec!["Invalid TOML syntax in port.toml"];
            lines.extend(msg.lines());
            fail(&lines);
        }
    };

    let config = read_config(&value);
    validate(&config);
    generate(&config);
}

/// Print a boxed error banner and abort the build
fn fail(lines: &[&str]) -> ! {
    let mut banner = String::from("\n╔══════════════════════════════════════════════════════════════════╗\n");
    for line in lines {
        let truncated = if line.len() > 64 {
            format!("{}...", &line[..61])
        } else {
            line.to_string()
        };
        banner.push_str(&format!("║  {:<64}║\n", truncated));
    }
    banner.push_str("╚══════════════════════════════════════════════════════════════════╝\n");
    panic!("{}", banner);
}

fn integer(value: &toml::Value, section: &str, key: &str) -> i64 {
    match value.get(section).and_then(|s| s.get(key)) {
        Some(toml::Value::Integer(i)) => *i,
        Some(_) => fail(&[&format!("[{}] {} must be an integer", section, key)]),
        None => fail(&[&format!("Missing [{}] {}", section, key)]),
    }
}

fn string(value: &toml::Value, section: &str, key: &str) -> String {
    match value.get(section).and_then(|s| s.get(key)) {
        Some(toml::Value::String(s)) => s.clone(),
        Some(_) => fail(&[&format!("[{}] {} must be a string", section, key)]),
        None => fail(&[&format!("Missing [{}] {}", section, key)]),
    }
}

fn read_config(value: &toml::Value) -> BoardConfig {
    BoardConfig {
        instance: integer(value, "usart", "instance"),
        baud_rate: integer(value, "usart", "baud_rate"),
        data_bits: integer(value, "usart", "data_bits"),
        parity: string(value, "usart", "parity"),
        cpu_hz: integer(value, "clock", "cpu_hz"),
        main_prescaler: integer(value, "clock", "main_prescaler"),
        timer_prescaler: integer(value, "clock", "timer_prescaler"),
        node_address: integer(value, "modbus", "node_address"),
    }
}

fn validate(config: &BoardConfig) {
    let mut errors: Vec<String> = Vec::new();

    if !(0..=1).contains(&config.instance) {
        errors.push(format!("usart.instance = {}: expected 0 or 1", config.instance));
    }
    if config.data_bits != 7 && config.data_bits != 8 {
        errors.push(format!("usart.data_bits = {}: expected 7 or 8", config.data_bits));
    }
    if !matches!(config.parity.as_str(), "none" | "even" | "odd") {
        errors.push(format!("usart.parity = {:?}: expected none, even or odd", config.parity));
    }
    if !MAIN_PRESCALERS.contains(&config.main_prescaler) {
        errors.push(format!("clock.main_prescaler = {} is not supported", config.main_prescaler));
    }
    if !TIMER_PRESCALERS.iter().any(|(div, _)| *div == config.timer_prescaler) {
        errors.push(format!("clock.timer_prescaler = {} is not supported", config.timer_prescaler));
    }
    if config.cpu_hz <= 0 || config.cpu_hz > u32::MAX as i64 {
        errors.push(format!("clock.cpu_hz = {} is out of range", config.cpu_hz));
    }
    if config.baud_rate <= 0 || config.baud_rate > u32::MAX as i64 {
        errors.push(format!("usart.baud_rate = {} is out of range", config.baud_rate));
    }
    if !(1..=247).contains(&config.node_address) {
        errors.push(format!("modbus.node_address = {}: expected 1..=247", config.node_address));
    }

    if errors.is_empty() {
        // Same arithmetic as mbport-core's baud_divisor and TimerClock
        let reference = 64 * config.cpu_hz / config.main_prescaler;
        if reference > u32::MAX as i64 {
            errors.push(format!(
                "baud reference 64 * {} / {} exceeds 32 bits",
                config.cpu_hz, config.main_prescaler
            ));
        }
        let quotient = reference / (config.baud_rate * 16);
        if quotient == 0 || quotient - 1 > u16::MAX as i64 {
            errors.push(format!(
                "baud {} unreachable from {} Hz / {}",
                config.baud_rate, config.cpu_hz, config.main_prescaler
            ));
        }

        let counts = config.cpu_hz * 50 / (config.main_prescaler * config.timer_prescaler * 1_000_000);
        if counts == 0 {
            errors.push(format!(
                "timer prescaler {} gives no counts per 50us",
                config.timer_prescaler
            ));
        }
    }

    if !errors.is_empty() {
        let mut lines = vec!["Invalid configuration in port.toml".to_string()];
        lines.extend(errors);
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        fail(&refs);
    }
}

fn generate(config: &BoardConfig) {
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR not set"));

    let instance = if config.instance == 0 { "Usart0" } else { "Usart1" };
    let data_bits = if config.data_bits == 7 { "Seven" } else { "Eight" };
    let parity = match config.parity.as_str() {
        "even" => "Even",
        "odd" => "Odd",
        _ => "None",
    };
    let prescaler = TIMER_PRESCALERS
        .iter()
        .find(|(div, _)| *div == config.timer_prescaler)
        .map(|(_, name)| *name)
        .unwrap_or("Div16");

    let source = format!(
        "// Generated from port.toml by build.rs\n\
         \n\
         /// USART instance the Modbus line is wired to\n\
         pub const USART_INSTANCE: crate::usart::UsartInstance = crate::usart::UsartInstance::{instance};\n\
         \n\
         /// Port configuration from port.toml\n\
         pub const PORT_CONFIG: mbport_core::PortConfig = mbport_core::PortConfig {{\n\
         \x20   node_address: {node},\n\
         \x20   baud_rate: {baud},\n\
         \x20   data_bits: mbport_hal::DataBits::{data_bits},\n\
         \x20   parity: mbport_hal::Parity::{parity},\n\
         \x20   cpu_hz: {cpu},\n\
         \x20   main_clock_prescaler: {main},\n\
         \x20   timer_prescaler: mbport_hal::TimerPrescaler::{prescaler},\n\
         }};\n",
        instance = instance,
        node = config.node_address,
        baud = config.baud_rate,
        data_bits = data_bits,
        parity = parity,
        cpu = config.cpu_hz,
        main = config.main_prescaler,
        prescaler = prescaler,
    );

    if let Err(e) = fs::write(out_dir.join("board_config.rs"), source) {
        fail(&["Failed to write board_config.rs", &e.to_string()]);
    }
}
