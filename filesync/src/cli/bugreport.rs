use bugreport::{
    bugreport,
    collector::{CompileTimeInformation, EnvironmentVariables, OperatingSystem, SoftwareVersion},
    format::Markdown,
};
use client::config;

pub fn run() {
    bugreport!()
        .info(SoftwareVersion::default())
        .info(OperatingSystem::default())
        .info(EnvironmentVariables::list(&[
            "SHELL",
            "TERM",
            "RUST_LOG",
            config::API_URI_VAR,
            config::ORDER_FAILURE_VAR,
            config::LINK_REFRESH_VAR,
            config::TOKEN_FILE_VAR,
        ]))
        .info(CompileTimeInformation::default())
        .print::<Markdown>();
}
