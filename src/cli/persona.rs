use crate::core::AppConfig;

pub fn run(config: &AppConfig) {
    println!("{}", config.system_instruction);
}
