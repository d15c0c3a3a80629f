use std::env;

pub fn run() {
    let name = clap::crate_name!();
    let version = clap::crate_version!();

    println!("Name           : {name}");
    println!("Version        : {version}");
    println!("OS             : {}", env::consts::OS);
    println!("Architecture   : {}", env::consts::ARCH);
    println!("API            : {}", client::config::Config::from_env().uri);
}
