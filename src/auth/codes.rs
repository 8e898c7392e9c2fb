use rand::{distributions::Alphanumeric, Rng};

pub const ACTIVATION_CODE_DIGITS: u32 = 6;
pub const RESET_TOKEN_LEN: usize = 64;

/// Numeric activation code with exactly `ACTIVATION_CODE_DIGITS` digits,
/// drawn uniformly from the range that excludes leading zeros.
pub fn generate_activation_code() -> String {
    let min = 10u32.pow(ACTIVATION_CODE_DIGITS - 1);
    let max = 10u32.pow(ACTIVATION_CODE_DIGITS) - 1;
    rand::thread_rng().gen_range(min..=max).to_string()
}

/// High-entropy single-use token for password resets.
pub fn generate_reset_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RESET_TOKEN_LEN)
        .map(char::from)
        .collect()
}
