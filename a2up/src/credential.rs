use anyhow::Context;

pub const PASSWORD_PROMPT: &str = "Enter password: ";

/// Read the SSH password from the terminal without echoing it.
///
/// Blocks on terminal input; call it from `spawn_blocking` inside the runtime.
pub fn prompt_password() -> anyhow::Result<remote::Credential> {
    let password =
        rpassword::prompt_password(PASSWORD_PROMPT).context("failed to read password")?;
    Ok(remote::Credential::Password(password))
}
