use std::sync::{Arc, Mutex};
use std::time::Duration;

use znprims_engine::requests::{self, DataRequest};
use znprims_engine::{Engine, EngineConfig, EngineError, Inbound, Match, Outbound, Outcome};
use znprims_registry::{
    Address, BroadcastAddress, Command, CommandRegistry, CommandType, Eui64, FieldMap, Frame,
    Subsystem,
};

fn registry() -> Arc<CommandRegistry> {
    Arc::new(CommandRegistry::builtin().expect("builtin catalog should load"))
}

fn engine_with(config: EngineConfig) -> (Engine, Outbound) {
    Engine::new(registry(), config).expect("config should be valid")
}

fn engine() -> (Engine, Outbound) {
    engine_with(EngineConfig::default())
}

fn node_desc_req(engine: &Engine, target: u16) -> Command {
    let fields = FieldMap::new()
        .with("dstaddr", target)
        .with("nwkaddrofinterest", 0x2EA2u16);
    engine
        .registry()
        .build(CommandType::Sreq, Subsystem::Zdo, "nodeDescReq", fields)
        .expect("nodeDescReq should build")
}

fn node_desc_rsp_for(target: u16) -> Match {
    Match::areq(Subsystem::Zdo, "nodeDescRsp").with_field("srcaddr", target)
}

fn node_desc_rsp_bytes(engine: &Engine, srcaddr: u16, manufacturer: u16) -> Vec<u8> {
    let fields = FieldMap::new()
        .with("srcaddr", srcaddr)
        .with("status", 0u8)
        .with("nwkaddr", srcaddr)
        .with("logicaltype_cmplxdescavai_userdescavai", 0u8)
        .with("apsflags_freqband", 0u8)
        .with("maccapflags", 0u8)
        .with("manufacturercode", manufacturer)
        .with("maxbuffersize", 0u8)
        .with("maxintransfersize", 0u16)
        .with("servermask", 0u16)
        .with("maxouttransfersize", 0u16)
        .with("descriptorcap", 0u8);
    engine
        .registry()
        .build(CommandType::Areq, Subsystem::Zdo, "nodeDescRsp", fields)
        .expect("nodeDescRsp should build")
        .to_frame()
        .to_bytes()
        .expect("frame should encode")
        .to_vec()
}

fn data_confirm_bytes(engine: &Engine, transid: u8, status: u8) -> Vec<u8> {
    let fields = FieldMap::new()
        .with("status", status)
        .with("endpoint", 1u8)
        .with("transid", transid);
    engine
        .registry()
        .build(CommandType::Areq, Subsystem::Af, "dataConfirm", fields)
        .expect("dataConfirm should build")
        .to_frame()
        .to_bytes()
        .expect("frame should encode")
        .to_vec()
}

fn collect_dispatch(engine: &Engine) -> Arc<Mutex<Vec<Inbound>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    engine.set_dispatch({
        let seen = Arc::clone(&seen);
        move |inbound| seen.lock().expect("dispatch log lock").push(inbound)
    });
    seen
}

#[tokio::test]
async fn node_descriptor_transaction() {
    let (engine, mut outbound) = engine();

    let handle = engine
        .send(node_desc_req(&engine, 0xD04A), node_desc_rsp_for(0xD04A))
        .await
        .expect("send should succeed");
    assert_eq!(handle.sequence(), Some(1));
    assert_eq!(engine.pending(), 1);

    let written = outbound.next_bytes().await.expect("frame should be queued");
    assert_eq!(
        written.as_ref(),
        &[0xFE, 0x04, 0x25, 0x02, 0x4A, 0xD0, 0xA2, 0x2E, 0x35]
    );

    let report = engine.on_bytes(&node_desc_rsp_bytes(&engine, 0xD04A, 1234));
    assert_eq!(report.resolved, 1);

    let reply = handle
        .wait(Duration::from_secs(1))
        .await
        .into_command()
        .expect("reply should resolve the waiter");
    assert_eq!(reply.name(), "nodeDescRsp");
    assert_eq!(
        reply.get("manufacturercode").and_then(|v| v.as_u64()),
        Some(1234)
    );
    assert_eq!(engine.pending(), 0);
}

#[tokio::test]
async fn node_descriptor_helper_returns_reply() {
    let (engine, mut outbound) = engine();

    let caller = tokio::spawn({
        let engine = engine.clone();
        async move { requests::node_descriptor(&engine, 0xD04A, 0xD04A).await }
    });

    outbound.next_frame().await.expect("request should be written");
    // A reply from some other device must not satisfy the waiter.
    let report = engine.on_bytes(&node_desc_rsp_bytes(&engine, 0x1111, 1));
    assert_eq!(report.dispatched, 1);
    engine.on_bytes(&node_desc_rsp_bytes(&engine, 0xD04A, 1234));

    let reply = caller
        .await
        .expect("caller task should finish")
        .expect("descriptor should arrive");
    assert_eq!(
        reply.get("manufacturercode").and_then(|v| v.as_u64()),
        Some(1234)
    );
}

#[tokio::test]
async fn first_registered_waiter_wins() {
    let (engine, _outbound) = engine();
    let broad = engine
        .register(Match::areq(Subsystem::Zdo, "nodeDescRsp"))
        .expect("register should succeed");
    let narrow = engine
        .register(node_desc_rsp_for(0xD04A))
        .expect("register should succeed");

    engine.on_bytes(&node_desc_rsp_bytes(&engine, 0xD04A, 1));
    assert!(broad.wait(Duration::from_secs(1)).await.is_resolved());
    assert_eq!(engine.pending(), 1);

    // Same reply again inside the duplicate window still reaches the live
    // narrow waiter.
    engine.on_bytes(&node_desc_rsp_bytes(&engine, 0xD04A, 2));
    let second = narrow
        .wait(Duration::from_secs(1))
        .await
        .into_command()
        .expect("narrow waiter should resolve");
    assert_eq!(
        second.get("manufacturercode").and_then(|v| v.as_u64()),
        Some(2)
    );
}

#[tokio::test]
async fn gate_allows_one_request_in_flight() {
    let (engine, mut outbound) = engine();

    let first = engine
        .send(node_desc_req(&engine, 0x1111), node_desc_rsp_for(0x1111))
        .await
        .expect("first send should pass the gate");

    let second = tokio::spawn({
        let engine = engine.clone();
        async move {
            engine
                .send(node_desc_req(&engine, 0x2222), node_desc_rsp_for(0x2222))
                .await
        }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!second.is_finished(), "second request must wait for the gate");
    assert_eq!(engine.pending(), 1);
    assert!(outbound.try_next_frame().is_some());
    assert!(outbound.try_next_frame().is_none());

    engine.on_bytes(&node_desc_rsp_bytes(&engine, 0x1111, 1));
    assert!(first.wait(Duration::from_secs(1)).await.is_resolved());

    let second = second
        .await
        .expect("second task should finish")
        .expect("second send should pass the gate");
    assert_eq!(second.sequence(), Some(2));
    assert!(outbound.try_next_frame().is_some());
}

#[tokio::test]
async fn wider_gate_allows_parallel_requests() {
    let (engine, _outbound) = engine_with(EngineConfig {
        max_in_flight: 2,
        ..EngineConfig::default()
    });
    let _a = engine
        .send(node_desc_req(&engine, 1), node_desc_rsp_for(1))
        .await
        .expect("first send");
    let _b = tokio::time::timeout(
        Duration::from_secs(1),
        engine.send(node_desc_req(&engine, 2), node_desc_rsp_for(2)),
    )
    .await
    .expect("second send should not block")
    .expect("second send");
    assert_eq!(engine.pending(), 2);
}

#[tokio::test(start_paused = true)]
async fn timeout_cancels_only_its_own_waiter() {
    let (engine, _outbound) = engine_with(EngineConfig {
        max_in_flight: 2,
        ..EngineConfig::default()
    });
    let short = engine
        .send(node_desc_req(&engine, 1), node_desc_rsp_for(1))
        .await
        .expect("first send");
    let long = engine
        .send(node_desc_req(&engine, 2), node_desc_rsp_for(2))
        .await
        .expect("second send");

    assert_eq!(short.wait(Duration::from_millis(100)).await, Outcome::TimedOut);
    assert_eq!(engine.pending(), 1);

    engine.on_bytes(&node_desc_rsp_bytes(&engine, 2, 7));
    assert!(long.wait(Duration::from_secs(1)).await.is_resolved());
}

#[tokio::test(start_paused = true)]
async fn expired_waiter_frees_the_gate() {
    let (engine, _outbound) = engine_with(EngineConfig {
        reply_timeout: Duration::from_secs(1),
        ..EngineConfig::default()
    });
    let abandoned = engine
        .send(node_desc_req(&engine, 1), node_desc_rsp_for(1))
        .await
        .expect("first send");

    let next = engine
        .send(node_desc_req(&engine, 2), node_desc_rsp_for(2))
        .await
        .expect("gate should reopen once the first waiter expires");
    assert_eq!(next.sequence(), Some(2));
    assert_eq!(abandoned.wait(Duration::from_secs(1)).await, Outcome::TimedOut);
}

#[tokio::test]
async fn shutdown_cancels_every_waiter() {
    let (engine, _outbound) = engine();
    let sent = engine
        .send(node_desc_req(&engine, 1), node_desc_rsp_for(1))
        .await
        .expect("send");
    let registered = engine
        .register(Match::areq(Subsystem::Zdo, "stateChangeInd"))
        .expect("register");

    let waiting = tokio::spawn(sent.wait(Duration::from_secs(30)));
    tokio::task::yield_now().await;
    engine.shutdown();

    assert_eq!(waiting.await.expect("wait task"), Outcome::Cancelled);
    assert_eq!(
        registered.wait(Duration::from_secs(30)).await,
        Outcome::Cancelled
    );
    assert_eq!(engine.pending(), 0);
    assert!(matches!(
        engine
            .send(node_desc_req(&engine, 1), node_desc_rsp_for(1))
            .await,
        Err(EngineError::Shutdown)
    ));
}

#[tokio::test]
async fn repeated_reply_is_ignored() {
    let (engine, _outbound) = engine();
    let seen = collect_dispatch(&engine);
    let handle = engine
        .send(node_desc_req(&engine, 0xD04A), node_desc_rsp_for(0xD04A))
        .await
        .expect("send");

    let bytes = node_desc_rsp_bytes(&engine, 0xD04A, 1234);
    assert_eq!(engine.on_bytes(&bytes).resolved, 1);
    let repeat = engine.on_bytes(&bytes);
    assert_eq!(repeat.duplicates, 1);
    assert_eq!(repeat.dispatched, 0);

    assert!(handle.wait(Duration::from_secs(1)).await.is_resolved());
    assert!(seen.lock().expect("dispatch log lock").is_empty());
}

fn announce_bytes(engine: &Engine, nwkaddr: u16) -> Vec<u8> {
    let fields = FieldMap::new()
        .with("srcaddr", nwkaddr)
        .with("nwkaddr", nwkaddr)
        .with("ieeeaddr", Eui64([0x00, 0x12, 0x4B, 0x00, 0x01, 0x02, 0x03, nwkaddr as u8]))
        .with("capabilities", 0x8Eu8);
    engine
        .registry()
        .build(CommandType::Areq, Subsystem::Zdo, "endDeviceAnnceInd", fields)
        .expect("endDeviceAnnceInd should build")
        .to_frame()
        .to_bytes()
        .expect("frame should encode")
        .to_vec()
}

#[tokio::test]
async fn next_announce_is_dispatched_after_waiter_resolves() {
    let (engine, _outbound) = engine();
    let seen = collect_dispatch(&engine);
    let handle = engine
        .register(Match::areq(Subsystem::Zdo, "endDeviceAnnceInd"))
        .expect("register should succeed");

    assert_eq!(engine.on_bytes(&announce_bytes(&engine, 0x1111)).resolved, 1);
    drop(handle);

    let report = engine.on_bytes(&announce_bytes(&engine, 0x2222));
    assert_eq!(report.duplicates, 0);
    assert_eq!(report.dispatched, 1);

    let seen = seen.lock().expect("dispatch log lock");
    assert_eq!(seen.len(), 1);
    let Inbound::Command(announce) = &seen[0] else {
        panic!("announce should decode");
    };
    assert_eq!(announce.get("nwkaddr").and_then(|v| v.as_u64()), Some(0x2222));
}

#[tokio::test]
async fn next_indication_is_dispatched_after_waiter_times_out() {
    let (engine, _outbound) = engine();
    let seen = collect_dispatch(&engine);
    let handle = engine
        .register(Match::areq(Subsystem::Zdo, "endDeviceAnnceInd"))
        .expect("register should succeed");

    assert_eq!(handle.wait(Duration::from_millis(10)).await, Outcome::TimedOut);

    let report = engine.on_bytes(&announce_bytes(&engine, 0x3333));
    assert_eq!(report.duplicates, 0);
    assert_eq!(report.dispatched, 1);
    assert_eq!(seen.lock().expect("dispatch log lock").len(), 1);
}

#[tokio::test]
async fn unexpected_confirm_is_dispatched() {
    let (engine, _outbound) = engine();
    let seen = collect_dispatch(&engine);

    let report = engine.on_bytes(&data_confirm_bytes(&engine, 42, 0));
    assert_eq!(report.dispatched, 1);

    let seen = seen.lock().expect("dispatch log lock");
    let Inbound::Command(confirm) = &seen[0] else {
        panic!("confirm should decode");
    };
    assert_eq!(confirm.name(), "dataConfirm");
    assert_eq!(confirm.sequence(), Some(42));
}

#[tokio::test]
async fn malformed_reply_fails_identity_waiter() {
    let (engine, _outbound) = engine();
    let handle = engine
        .register(Match::areq(Subsystem::Zdo, "nodeDescRsp"))
        .expect("register");

    // AREQ ZDO nodeDescRsp with only two payload bytes.
    let frame = Frame::new(CommandType::Areq, Subsystem::Zdo, 0x82, vec![0x4A, 0xD0]);
    let report = engine.on_bytes(&frame.to_bytes().expect("frame should encode"));
    assert_eq!(report.failed, 1);

    let outcome = handle.wait(Duration::from_secs(1)).await;
    assert!(matches!(outcome, Outcome::Failed(_)));
}

#[tokio::test]
async fn unicast_waits_for_matching_confirm() {
    let (engine, mut outbound) = engine();
    let caller = tokio::spawn({
        let engine = engine.clone();
        async move {
            let request = DataRequest::new(Address::Nwk(0xD04A), 1, 1, 6, vec![0x01, 0x00, 0x01]);
            requests::unicast(&engine, request).await
        }
    });

    let frame = outbound.next_frame().await.expect("request should be written");
    let sent = engine
        .registry()
        .parse(&frame)
        .expect("request should decode");
    assert_eq!(sent.name(), "dataRequest");
    let tsn = sent.sequence().expect("dataRequest carries transid");
    assert_eq!(tsn, 1);

    // Confirms for other transactions are not ours.
    engine.on_bytes(&data_confirm_bytes(&engine, tsn.wrapping_add(1), 0));
    engine.on_bytes(&data_confirm_bytes(&engine, tsn, 0));

    let status = caller
        .await
        .expect("caller task")
        .expect("unicast should complete");
    assert_eq!(status, (0, "message send success".to_string()));
}

#[tokio::test]
async fn rejected_request_reports_srsp_status() {
    let (engine, mut outbound) = engine();
    let caller = tokio::spawn({
        let engine = engine.clone();
        async move {
            let request = DataRequest::new(Address::Nwk(0xD04A), 1, 1, 6, vec![0x00]);
            requests::unicast(&engine, request).await
        }
    });
    outbound.next_frame().await.expect("request should be written");

    // SRSP AF dataRequest, status INVALID_PARAMETER.
    let srsp = Frame::new(CommandType::Srsp, Subsystem::Af, 0x01, vec![0x02]);
    engine.on_bytes(&srsp.to_bytes().expect("frame should encode"));

    let (code, message) = caller
        .await
        .expect("caller task")
        .expect("unicast should complete");
    assert_eq!(code, 0x02);
    assert!(message.contains("0x02"), "{message}");
}

#[tokio::test]
async fn multicast_registers_one_waiter() {
    let (engine, mut outbound) = engine();
    let caller = tokio::spawn({
        let engine = engine.clone();
        async move {
            let request = DataRequest::group(0x0002, 1, 4, vec![0x01, 0x27, 0x00]);
            requests::multicast(&engine, request).await
        }
    });

    let frame = outbound.next_frame().await.expect("request should be written");
    assert_eq!(engine.pending(), 1);
    let sent = engine.registry().parse(&frame).expect("request should decode");
    assert_eq!(sent.name(), "dataRequestExt");
    assert_eq!(
        sent.get("dstaddr").and_then(|v| v.as_address()),
        Some(&Address::Group(0x0002))
    );
    assert_eq!(sent.get("destendpoint").and_then(|v| v.as_u64()), Some(0xFF));
    assert_eq!(sent.get("radius").and_then(|v| v.as_u64()), Some(30));

    let tsn = sent.sequence().expect("transid");
    engine.on_bytes(&data_confirm_bytes(&engine, tsn, 0));
    let status = caller.await.expect("caller task").expect("multicast");
    assert_eq!(status, (0, "message send success".to_string()));
}

#[tokio::test]
async fn broadcast_permit_join_registers_nothing() {
    let (engine, mut outbound) = engine();
    let status = requests::permit_join(
        &engine,
        Address::Broadcast(BroadcastAddress::AllRoutersAndCoordinator),
        60,
    )
    .await
    .expect("permit join should be written");

    assert_eq!(status, (0, "broadcast send success".to_string()));
    assert_eq!(engine.pending(), 0);

    let frame = outbound.try_next_frame().expect("request should be queued");
    assert_eq!(frame.payload.as_ref(), &[0x0F, 0xFC, 0xFF, 60, 0]);
}

#[tokio::test]
async fn broadcast_data_registers_nothing() {
    let (engine, mut outbound) = engine();
    let request = DataRequest::broadcast(BroadcastAddress::AllDevices, 0xFF, 1, 6, vec![0x01]);
    let status = requests::send_data(&engine, request)
        .await
        .expect("broadcast should be written");
    assert_eq!(status.0, 0);
    assert_eq!(engine.pending(), 0);

    let frame = outbound.try_next_frame().expect("request should be queued");
    let sent = engine.registry().parse(&frame).expect("request should decode");
    assert_eq!(
        sent.get("dstaddr").and_then(|v| v.as_address()),
        Some(&Address::Broadcast(BroadcastAddress::AllDevices))
    );
}

#[tokio::test]
async fn unicast_permit_join_waits_for_response() {
    let (engine, mut outbound) = engine();
    let caller = tokio::spawn({
        let engine = engine.clone();
        async move { requests::permit_join(&engine, Address::Nwk(0x0000), 0).await }
    });
    outbound.next_frame().await.expect("request should be written");
    assert_eq!(engine.pending(), 1);

    let fields = FieldMap::new().with("srcaddr", 0x0000u16).with("status", 0u8);
    let rsp = engine
        .registry()
        .build(CommandType::Areq, Subsystem::Zdo, "mgmtPermitJoinRsp", fields)
        .expect("mgmtPermitJoinRsp should build");
    engine.on_bytes(&rsp.to_frame().to_bytes().expect("frame should encode"));

    let status = caller.await.expect("caller task").expect("permit join");
    assert_eq!(status.0, 0);
}

#[tokio::test]
async fn sequence_numbers_wrap_without_zero() {
    let (engine, mut outbound) = engine();
    let ping = engine
        .registry()
        .build(CommandType::Sreq, Subsystem::Sys, "ping", FieldMap::new())
        .expect("ping should build");

    let mut last = 0;
    for _ in 0..256 {
        let sent = engine.post(ping.clone()).await.expect("post");
        outbound.try_next_frame().expect("frame queued");
        last = sent.sequence().expect("tsn");
        assert_ne!(last, 0);
    }
    // 255 numbers, then the counter starts over at 1.
    assert_eq!(last, 1);
}
