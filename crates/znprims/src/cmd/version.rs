use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("znprims {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: znprims");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target: {}", env!("ZNPRIMS_BUILD_TARGET"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "rustc: {}",
        option_env!("RUSTC_VERSION").unwrap_or("unknown")
    );
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "features: engine={}, cli=true",
        cfg!(feature = "engine")
    );
    println!("max_payload: {}", znprims_frame::MAX_PAYLOAD);

    Ok(SUCCESS)
}
