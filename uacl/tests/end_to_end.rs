//! Client and server wired together through the loopback transport

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uacl::client::{ConnectionBuilder, ConnectionSupervisor, ReadOutcome, RemoteObject};
use uacl::loopback::LoopbackFactory;
use uacl::server::{MethodBinding, ObjectDescriptor, UaObject, UaServer};
use uacl::{StatusCode, UaclError, Variant};

#[derive(Default)]
struct Pump {
    speed: AtomicI32,
    started: AtomicBool,
}

impl UaObject for Pump {
    fn describe() -> ObjectDescriptor<Self> {
        ObjectDescriptor::new()
            .variable_rw(
                "Speed",
                |p: &Pump| p.speed.load(Ordering::SeqCst),
                |p: &Pump, v: i32| p.speed.store(v, Ordering::SeqCst),
            )
            .method(MethodBinding::new("Start", |p: &Pump, _call| {
                std::thread::sleep(Duration::from_millis(50));
                p.started.store(true, Ordering::SeqCst);
                Ok(Variant::Empty)
            }))
            .method(
                MethodBinding::new("Scale", |p: &Pump, call| {
                    let factor = call.arg::<f64>(0)?;
                    Ok(Variant::Double(p.speed.load(Ordering::SeqCst) as f64 * factor))
                })
                .input::<f64>("factor")
                .output::<f64>(),
            )
            .method(
                MethodBinding::new("Operator", |_: &Pump, call| {
                    let operator = call.context_as::<String>().cloned().unwrap_or_default();
                    Ok(Variant::String(operator))
                })
                .with_session_context()
                .output::<String>(),
            )
            .method(
                MethodBinding::new("Overheat", |_: &Pump, _call| {
                    anyhow::bail!("temperature limit exceeded")
                })
                .output::<i32>(),
            )
    }
}

#[derive(Default)]
struct Probe {
    count: AtomicI32,
    ratio: Mutex<f64>,
    label: Mutex<String>,
    armed: AtomicBool,
}

impl UaObject for Probe {
    fn describe() -> ObjectDescriptor<Self> {
        ObjectDescriptor::new()
            .variable_rw(
                "Count",
                |p: &Probe| p.count.load(Ordering::SeqCst),
                |p: &Probe, v: i32| p.count.store(v, Ordering::SeqCst),
            )
            .variable_rw(
                "Ratio",
                |p: &Probe| *p.ratio.lock().unwrap(),
                |p: &Probe, v: f64| *p.ratio.lock().unwrap() = v,
            )
            .variable_rw(
                "Label",
                |p: &Probe| p.label.lock().unwrap().clone(),
                |p: &Probe, v: String| *p.label.lock().unwrap() = v,
            )
            .variable_rw(
                "Armed",
                |p: &Probe| p.armed.load(Ordering::SeqCst),
                |p: &Probe, v: bool| p.armed.store(v, Ordering::SeqCst),
            )
    }
}

struct Plant {
    server: Arc<UaServer>,
    pump: Arc<Pump>,
    probe: Arc<Probe>,
}

fn plant() -> Plant {
    let server = Arc::new(UaServer::default());
    let pump = Arc::new(Pump::default());
    let probe = Arc::new(Probe::default());
    server.register(Arc::clone(&pump));
    server.register(Arc::clone(&probe));
    server.startup().unwrap();
    Plant {
        server,
        pump,
        probe,
    }
}

async fn connect(factory: LoopbackFactory) -> ConnectionSupervisor {
    let supervisor = ConnectionBuilder::new()
        .endpoint("localhost", 4840, "uacl")
        .retry_delay(Duration::from_millis(20))
        .connect_deadline(Duration::from_secs(1))
        .build(Arc::new(factory))
        .unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        while !supervisor.connected().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    supervisor
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pump_speed_and_start() {
    let plant = plant();
    let supervisor = connect(LoopbackFactory::new(Arc::clone(&plant.server))).await;
    let pump = RemoteObject::new(supervisor, ["application", "Pump_1"]);

    assert!(pump.write("Speed", 42i32).await);
    assert_eq!(plant.pump.speed.load(Ordering::SeqCst), 42);
    assert_eq!(pump.read::<i32>("Speed").await, 42);

    assert!(pump.invoke_void("Start", &[]).await);
    assert!(!plant.pump.started.load(Ordering::SeqCst));
    tokio::time::timeout(Duration::from_secs(5), async {
        while !plant.pump.started.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_round_trips() {
    let plant = plant();
    let supervisor = connect(LoopbackFactory::new(Arc::clone(&plant.server))).await;
    let probe = RemoteObject::new(supervisor, ["application", "Probe_2"]);

    assert_eq!(probe.read::<i32>("Count").await, 0);
    assert!(probe.write("Count", -17i32).await);
    assert_eq!(probe.read::<i32>("Count").await, -17);

    assert!(probe.write("Ratio", 0.25f64).await);
    assert_eq!(probe.read::<f64>("Ratio").await, 0.25);

    assert!(probe.write("Label", "north inlet".to_string()).await);
    assert_eq!(probe.read::<String>("Label").await, "north inlet");

    assert!(probe.write("Armed", true).await);
    assert!(probe.read::<bool>("Armed").await);
    assert!(plant.probe.armed.load(Ordering::SeqCst));

    assert!(!probe.write("Count", "seven".to_string()).await);
    assert_eq!(plant.probe.count.load(Ordering::SeqCst), -17);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_method_outputs_and_failures() {
    let plant = plant();
    plant.pump.speed.store(10, Ordering::SeqCst);
    let supervisor = connect(LoopbackFactory::new(Arc::clone(&plant.server))).await;
    let pump = RemoteObject::new(supervisor, ["application", "Pump_1"]);

    assert_eq!(pump.invoke::<f64>("Scale", &[&1.5f64]).await, 15.0);
    assert_eq!(
        pump.try_invoke::<f64>("Scale", &[]).await,
        Err(UaclError::BadStatus(StatusCode::BAD_INVALID_ARGUMENT))
    );
    assert_eq!(
        pump.try_invoke::<i32>("Overheat", &[]).await,
        Err(UaclError::BadStatus(StatusCode::BAD_UNEXPECTED_ERROR))
    );
    assert_eq!(pump.invoke::<i32>("Overheat", &[]).await, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_session_context_reaches_method() {
    let plant = plant();
    let factory = LoopbackFactory::new(Arc::clone(&plant.server))
        .with_context(Arc::new("operator-7".to_string()));
    let supervisor = connect(factory).await;
    let pump = RemoteObject::new(supervisor, ["application", "Pump_1"]);
    assert_eq!(pump.invoke::<String>("Operator", &[]).await, "operator-7");

    let anonymous = connect(LoopbackFactory::new(Arc::clone(&plant.server))).await;
    let pump = RemoteObject::new(anonymous, ["application", "Pump_1"]);
    assert_eq!(pump.invoke::<String>("Operator", &[]).await, "");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_monitor_and_local_change() {
    let plant = plant();
    let supervisor = connect(LoopbackFactory::new(Arc::clone(&plant.server))).await;
    let pump = RemoteObject::new(supervisor, ["application", "Pump_1"]);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    assert!(pump
        .monitor("Speed", move |value: &Variant| sink.lock().unwrap().push(value.clone()))
        .await);

    assert!(pump.write("Speed", 3i32).await);
    let capsule = plant.server.register(Arc::clone(&plant.pump));
    plant.pump.speed.store(8, Ordering::SeqCst);
    capsule.publish_change("Speed").unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![Variant::Int32(3), Variant::Int32(8)]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_disconnect_and_shutdown() {
    let plant = plant();
    let supervisor = connect(LoopbackFactory::new(Arc::clone(&plant.server))).await;
    let pump = RemoteObject::new(supervisor.clone(), ["application", "Pump_1"]);
    assert!(pump.write("Speed", 5i32).await);

    supervisor.disconnect().await;
    assert!(!supervisor.connected().await);
    assert!(matches!(
        pump.try_read::<i32>("Speed").await,
        ReadOutcome::Unavailable(UaclError::NotConnected)
    ));

    plant.server.shutdown();
    let late = ConnectionBuilder::new()
        .endpoint("localhost", 4840, "uacl")
        .build(Arc::new(LoopbackFactory::new(Arc::clone(&plant.server))))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!late.connected().await);
}
