use cpal::Device;
use cpal::traits::{DeviceTrait, HostTrait};

fn get_host() -> cpal::Host {
    cpal::default_host()
}

/// Resolves an input device by name, or the host default when no name is given.
pub fn get_or_default_input(device_name: Option<String>) -> anyhow::Result<Device> {
    let host = get_host();
    tracing::debug!("Host: {:?}", host.id());

    let Some(target) = device_name else {
        return host
            .default_input_device()
            .ok_or_else(|| anyhow::anyhow!("no default input device"));
    };

    for device in host.input_devices()? {
        if device.name().is_ok_and(|name| name == target) {
            return Ok(device);
        }
    }
    Err(anyhow::anyhow!("no input device named {:?}", target))
}

/// Resolves an output device by name, or the host default when no name is given.
pub fn get_or_default_output(device_name: Option<String>) -> anyhow::Result<Device> {
    let host = get_host();
    tracing::debug!("Host: {:?}", host.id());

    let Some(target) = device_name else {
        return host
            .default_output_device()
            .ok_or_else(|| anyhow::anyhow!("no default output device"));
    };

    for device in host.output_devices()? {
        if device.name().is_ok_and(|name| name == target) {
            return Ok(device);
        }
    }
    Err(anyhow::anyhow!("no output device named {:?}", target))
}

/// One line per input device with channel count and sample rate. The host
/// default is marked.
pub fn get_available_inputs() -> anyhow::Result<String> {
    for host in cpal::available_hosts() {
        tracing::debug!("Available host: {:?}", host);
    }

    let host = get_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    let mut device_names: Vec<String> = Vec::new();
    for device in host.input_devices()? {
        let name = device.name()?;
        let config = device.default_input_config()?;
        let mut line = format!(
            " * {}({}ch, {}hz)",
            name,
            config.channels(),
            config.sample_rate().0
        );
        if Some(&name) == default_name.as_ref() {
            line.push_str(" [default]");
        }
        device_names.push(line);
    }
    Ok(device_names.join("\n"))
}

/// One line per output device with channel count and sample rate. The host
/// default is marked.
pub fn get_available_outputs() -> anyhow::Result<String> {
    for host in cpal::available_hosts() {
        tracing::debug!("Available host: {:?}", host);
    }

    let host = get_host();
    let default_name = host.default_output_device().and_then(|d| d.name().ok());

    let mut device_names: Vec<String> = Vec::new();
    for device in host.output_devices()? {
        let name = device.name()?;
        let config = device.default_output_config()?;
        let mut line = format!(
            " * {}({}ch, {}hz)",
            name,
            config.channels(),
            config.sample_rate().0
        );
        if Some(&name) == default_name.as_ref() {
            line.push_str(" [default]");
        }
        device_names.push(line);
    }
    Ok(device_names.join("\n"))
}
