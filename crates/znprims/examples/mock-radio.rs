//! Simulated ZNP radio on a Unix socket. Answers SYS ping and version, and
//! replies to ZDO nodeDescReq with an SRSP followed by a nodeDescRsp.
//!
//! Run with:
//!   cargo run --example mock-radio
//!
//! In another terminal:
//!   cargo run --features cli -- info unix:/tmp/znprims-radio-<pid>/radio.sock
//!   cargo run --features cli -- send unix:/tmp/znprims-radio-<pid>/radio.sock \
//!     ZDO nodeDescReq --json '{"dstaddr": "0xd04a", "nwkaddrofinterest": "0xd04a"}' \
//!     --expect ZDO:nodeDescRsp --match srcaddr=0xd04a

use std::fs;
use std::os::unix::net::UnixListener;

use znprims::frame::{Frame, FrameReader, FrameWriter};
use znprims::registry::{Command, CommandRegistry, CommandType, FieldMap, Subsystem, Value};

fn replies(registry: &CommandRegistry, request: &Command) -> Result<Vec<Frame>, Box<dyn std::error::Error>> {
    let srsp = |name: &str, fields: FieldMap| {
        registry
            .build(CommandType::Srsp, request.subsystem(), name, fields)
            .map(|command| command.to_frame())
    };

    let frames = match (request.subsystem(), request.name()) {
        (Subsystem::Sys, "ping") => vec![srsp("ping", FieldMap::new().with("capabilities", 0x0159u16))?],
        (Subsystem::Sys, "version") => vec![srsp(
            "version",
            FieldMap::new()
                .with("transportrev", 2u8)
                .with("product", 1u8)
                .with("majorrel", 2u8)
                .with("minorrel", 7u8)
                .with("maintrel", 1u8)
                .with("revision", 20_230_507u32),
        )?],
        (Subsystem::Zdo, "nodeDescReq") => {
            let target = request.get("dstaddr").cloned().unwrap_or(Value::U16(0));
            let rsp = registry.build(
                CommandType::Areq,
                Subsystem::Zdo,
                "nodeDescRsp",
                FieldMap::new()
                    .with("srcaddr", target.clone())
                    .with("status", 0u8)
                    .with("nwkaddr", target)
                    .with("logicaltype_cmplxdescavai_userdescavai", 1u8)
                    .with("apsflags_freqband", 0x40u8)
                    .with("maccapflags", 0x8Eu8)
                    .with("manufacturercode", 0x1234u16)
                    .with("maxbuffersize", 80u8)
                    .with("maxintransfersize", 160u16)
                    .with("servermask", 0u16)
                    .with("maxouttransfersize", 160u16)
                    .with("descriptorcap", 0u8),
            )?;
            vec![
                srsp("nodeDescReq", FieldMap::new().with("status", 0u8))?,
                rsp.to_frame(),
            ]
        }
        _ => Vec::new(),
    };
    Ok(frames)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let registry = CommandRegistry::builtin()?;

    let sock_dir = std::env::temp_dir().join(format!("znprims-radio-{}", std::process::id()));
    fs::create_dir_all(&sock_dir)?;
    let sock_path = sock_dir.join("radio.sock");
    let _ = fs::remove_file(&sock_path);

    let listener = UnixListener::bind(&sock_path)?;
    eprintln!("Radio listening on unix:{}", sock_path.display());

    for stream in listener.incoming() {
        let stream = stream?;
        let mut reader = FrameReader::new(stream.try_clone()?);
        let mut writer = FrameWriter::new(stream);
        eprintln!("Host connected");

        loop {
            let frame = match reader.read_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    eprintln!("Host disconnected: {e}");
                    break;
                }
            };
            let request = match registry.parse(&frame) {
                Ok(request) => request,
                Err(e) => {
                    eprintln!("Ignoring frame: {e}");
                    continue;
                }
            };
            eprintln!("<- {request}");
            for reply in replies(&registry, &request)? {
                writer.write_frame(&reply)?;
            }
        }
    }

    Ok(())
}
