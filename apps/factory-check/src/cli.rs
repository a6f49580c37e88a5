use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "factory-check")]
#[command(about = "Factory acceptance checks for thermal appliances")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Pair with a device in pairing mode and provision wifi credentials
    Pair {
        /// Network the device should join
        #[arg(long)]
        ssid: String,

        /// Password for that network
        #[arg(long, env = "FACTORY_WIFI_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Run the thermal acceptance check through the cloud
    Thermal {
        /// Serial number the result is recorded under
        #[arg(long)]
        serial: String,

        /// Cloud device id
        #[arg(long)]
        device_id: String,

        /// Firmware the device must report (overrides FACTORY_REQUIRED_FIRMWARE)
        #[arg(long)]
        firmware: Option<String>,

        /// Upper bound for every temperature delta, in °C
        #[arg(long)]
        max_delta_c: Option<f64>,
    },

    /// Post the one hour burn-in schedule to one or more devices
    BurnIn {
        /// Cloud device id, repeat for several devices
        #[arg(long = "device-id", required = true)]
        device_ids: Vec<String>,

        /// Minutes from now until the schedule starts
        #[arg(long, default_value_t = 0)]
        start_in_minutes: u32,
    },
}
