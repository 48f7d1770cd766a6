//! End-to-end tests of the control operations.
//!
//! These tests run every operation against an in-memory daemon that answers
//! from a script and records what it was asked, so the exact sequence of
//! bus traffic can be checked without a system bus.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use connmanrs::{
    Agent, Bus, Clock, ClockSync, CodecError, ConnMan, ConnManConfig, ConnmanError, Ipv4Config,
    ObjectPath, PropertyDict, Reply, Service, Target, Technology, Variant,
};

const WIFI_SERVICE: &str = "/net/connman/service/wifi_home_psk";
const ETH_SERVICE: &str = "/net/connman/service/ethernet_cable";
const WIFI_TECH: &str = "/net/connman/technology/wifi";

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Call {
        path: String,
        method: String,
        args: Vec<Variant>,
    },
    Set {
        path: String,
        name: String,
        value: Variant,
    },
    Export(String),
    Withdraw(String),
    Close,
}

/// Scripted stand-in for the daemon and the system bus.
#[derive(Debug, Default)]
struct MockDaemon {
    replies: Mutex<HashMap<(String, String), Reply>>,
    failures: Mutex<HashMap<String, String>>,
    events: Mutex<Vec<Event>>,
    agent_answers: Mutex<Vec<PropertyDict>>,
    refuse_export: bool,
    hang_on_connect: bool,
}

impl MockDaemon {
    fn reply(&self, path: &str, method: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .insert((path.to_string(), method.to_string()), reply);
    }

    fn fail(&self, method: &str, error_name: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(method.to_string(), error_name.to_string());
    }

    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn methods(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .map(|e| match e {
                Event::Call { method, .. } => method,
                Event::Set { name, .. } => format!("Set {name}"),
                Event::Export(_) => "export".into(),
                Event::Withdraw(_) => "withdraw".into(),
                Event::Close => "close".into(),
            })
            .collect()
    }

    fn check_failure(&self, method: &str) -> connmanrs::Result<()> {
        match self.failures.lock().unwrap().get(method) {
            Some(name) => Err(ConnmanError::Remote {
                name: name.clone(),
                message: format!("{method} failed"),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Bus for MockDaemon {
    async fn call(
        &self,
        target: &Target,
        method: &str,
        args: Vec<Variant>,
    ) -> connmanrs::Result<Reply> {
        self.events.lock().unwrap().push(Event::Call {
            path: target.path.to_string(),
            method: method.to_string(),
            args,
        });
        if self.hang_on_connect && method == "Connect" {
            std::future::pending::<()>().await;
        }
        self.check_failure(method)?;
        Ok(self
            .replies
            .lock()
            .unwrap()
            .get(&(target.path.to_string(), method.to_string()))
            .cloned()
            .unwrap_or(Reply::Empty))
    }

    async fn set_property(
        &self,
        target: &Target,
        name: &str,
        value: Variant,
    ) -> connmanrs::Result<()> {
        self.events.lock().unwrap().push(Event::Set {
            path: target.path.to_string(),
            name: name.to_string(),
            value,
        });
        self.check_failure("SetProperty")
    }

    async fn export_agent(&self, agent: Agent) -> connmanrs::Result<()> {
        if self.refuse_export {
            return Err(ConnmanError::AgentUnavailable("object server busy".into()));
        }
        self.events
            .lock()
            .unwrap()
            .push(Event::Export(agent.path().to_string()));
        self.agent_answers
            .lock()
            .unwrap()
            .push(agent.request_input(WIFI_SERVICE));
        Ok(())
    }

    async fn withdraw_agent(&self, path: &ObjectPath) -> connmanrs::Result<()> {
        self.events
            .lock()
            .unwrap()
            .push(Event::Withdraw(path.to_string()));
        Ok(())
    }

    async fn close(&self) -> connmanrs::Result<()> {
        self.events.lock().unwrap().push(Event::Close);
        Ok(())
    }
}

fn setup(daemon: MockDaemon) -> (Arc<MockDaemon>, ConnMan) {
    let daemon = Arc::new(daemon);
    let config = ConnManConfig::default().with_clock_sync(ClockSync::disabled());
    let cm = ConnMan::with_bus(daemon.clone(), config);
    (daemon, cm)
}

fn dict(entries: Vec<(&str, Variant)>) -> PropertyDict {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn secured_service() -> Service {
    Service {
        path: ObjectPath::from(WIFI_SERVICE),
        name: "HomeWiFi".into(),
        service_type: "wifi".into(),
        security: vec!["psk".into()],
        ..Default::default()
    }
}

fn open_service() -> Service {
    Service {
        path: ObjectPath::from(ETH_SERVICE),
        name: "Wired".into(),
        service_type: "ethernet".into(),
        security: vec!["none".into()],
        ..Default::default()
    }
}

fn wifi_tech() -> Technology {
    Technology {
        path: ObjectPath::from(WIFI_TECH),
        name: "WiFi".into(),
        technology_type: "wifi".into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_list_services_decodes_every_object() {
    let daemon = MockDaemon::default();
    daemon.reply(
        "/",
        "GetServices",
        Reply::Objects(vec![
            (
                ObjectPath::from(WIFI_SERVICE),
                dict(vec![
                    ("Name", Variant::Str("HomeWiFi".into())),
                    ("Type", Variant::Str("wifi".into())),
                    ("State", Variant::Str("online".into())),
                    ("Security", Variant::StrList(vec!["psk".into()])),
                    ("Strength", Variant::Byte(70)),
                    ("Favorite", Variant::Bool(true)),
                    (
                        "IPv4",
                        Variant::Dict(dict(vec![
                            ("Method", Variant::Str("dhcp".into())),
                            ("Address", Variant::Str("192.168.1.23".into())),
                        ])),
                    ),
                    (
                        "Nameservers.Configuration",
                        Variant::StrList(vec!["1.1.1.1".into()]),
                    ),
                ]),
            ),
            (
                ObjectPath::from(ETH_SERVICE),
                dict(vec![("Name", Variant::Str("Wired".into()))]),
            ),
        ]),
    );
    let (_daemon, cm) = setup(daemon);

    let services = cm.list_services().await.unwrap();
    assert_eq!(services.len(), 2);

    let wifi = &services[0];
    assert_eq!(wifi.path.as_str(), WIFI_SERVICE);
    assert_eq!(wifi.name, "HomeWiFi");
    assert_eq!(wifi.state, "online");
    assert_eq!(wifi.strength, 70);
    assert!(wifi.favorite);
    assert!(wifi.is_secured());
    assert_eq!(wifi.ipv4.method, "dhcp");
    assert_eq!(wifi.ipv4.address, "192.168.1.23");
    assert_eq!(wifi.nameservers_configuration, vec!["1.1.1.1".to_string()]);

    assert_eq!(services[1].path.as_str(), ETH_SERVICE);
    assert_eq!(services[1].name, "Wired");
    assert!(!services[1].is_secured());
}

#[tokio::test]
async fn test_list_services_rejects_mistyped_property() {
    let daemon = MockDaemon::default();
    daemon.reply(
        "/",
        "GetServices",
        Reply::Objects(vec![(
            ObjectPath::from(WIFI_SERVICE),
            dict(vec![("Strength", Variant::Str("strong".into()))]),
        )]),
    );
    let (_daemon, cm) = setup(daemon);

    let err = cm.list_services().await.unwrap_err();
    assert!(matches!(
        err,
        ConnmanError::Codec(CodecError::TypeMismatch { ref field, .. }) if field == "Strength"
    ));
}

#[tokio::test]
async fn test_list_services_rejects_wrong_reply_shape() {
    let daemon = MockDaemon::default();
    daemon.reply("/", "GetServices", Reply::Properties(PropertyDict::new()));
    let (_daemon, cm) = setup(daemon);

    let err = cm.list_services().await.unwrap_err();
    assert!(matches!(err, ConnmanError::UnexpectedReply { .. }));
}

#[tokio::test]
async fn test_list_technologies() {
    let daemon = MockDaemon::default();
    daemon.reply(
        "/",
        "GetTechnologies",
        Reply::Objects(vec![(
            ObjectPath::from(WIFI_TECH),
            dict(vec![
                ("Name", Variant::Str("WiFi".into())),
                ("Type", Variant::Str("wifi".into())),
                ("Powered", Variant::Bool(true)),
                ("Connected", Variant::Bool(false)),
                ("Tethering", Variant::Bool(false)),
            ]),
        )]),
    );
    let (_daemon, cm) = setup(daemon);

    let techs = cm.list_technologies().await.unwrap();
    assert_eq!(techs.len(), 1);
    assert_eq!(techs[0].path.as_str(), WIFI_TECH);
    assert_eq!(techs[0].technology_type, "wifi");
    assert!(techs[0].powered);
}

#[tokio::test]
async fn test_wifi_reads_fixed_path() {
    let daemon = MockDaemon::default();
    daemon.reply(
        WIFI_TECH,
        "GetProperties",
        Reply::Properties(dict(vec![
            ("Name", Variant::Str("WiFi".into())),
            ("Powered", Variant::Bool(false)),
        ])),
    );
    let (daemon, cm) = setup(daemon);

    let tech = cm.wifi().await.unwrap();
    assert_eq!(tech.path.as_str(), WIFI_TECH);
    assert!(!tech.powered);
    assert_eq!(
        daemon.events(),
        vec![Event::Call {
            path: WIFI_TECH.into(),
            method: "GetProperties".into(),
            args: vec![],
        }]
    );
}

#[tokio::test]
async fn test_connect_secured_service_uses_agent() {
    let (daemon, cm) = setup(MockDaemon::default());

    cm.connect(&secured_service(), "hunter22").await.unwrap();

    assert_eq!(
        daemon.events(),
        vec![
            Event::Export("/test/agent".into()),
            Event::Call {
                path: "/".into(),
                method: "RegisterAgent".into(),
                args: vec![Variant::ObjectPath(ObjectPath::from("/test/agent"))],
            },
            Event::Call {
                path: WIFI_SERVICE.into(),
                method: "Connect".into(),
                args: vec![],
            },
            Event::Call {
                path: "/".into(),
                method: "UnregisterAgent".into(),
                args: vec![Variant::ObjectPath(ObjectPath::from("/test/agent"))],
            },
            Event::Withdraw("/test/agent".into()),
        ]
    );

    let answers = daemon.agent_answers.lock().unwrap().clone();
    assert_eq!(
        answers,
        vec![dict(vec![("Passphrase", Variant::Str("hunter22".into()))])]
    );
}

#[tokio::test]
async fn test_connect_failure_still_removes_agent() {
    let daemon = MockDaemon::default();
    daemon.fail("Connect", "net.connman.Error.InvalidKey");
    let (daemon, cm) = setup(daemon);

    let err = cm.connect(&secured_service(), "wrong").await.unwrap_err();
    assert!(matches!(
        err,
        ConnmanError::Remote { ref name, .. } if name == "net.connman.Error.InvalidKey"
    ));
    assert_eq!(
        daemon.methods(),
        vec![
            "export",
            "RegisterAgent",
            "Connect",
            "UnregisterAgent",
            "withdraw"
        ]
    );
}

#[tokio::test]
async fn test_connect_unregister_failure_is_not_reported() {
    let daemon = MockDaemon::default();
    daemon.fail("UnregisterAgent", "net.connman.Error.NotRegistered");
    let (daemon, cm) = setup(daemon);

    cm.connect(&secured_service(), "hunter22").await.unwrap();
    assert_eq!(daemon.methods().last().map(String::as_str), Some("withdraw"));
}

#[tokio::test]
async fn test_connect_register_failure_withdraws_agent() {
    let daemon = MockDaemon::default();
    daemon.fail("RegisterAgent", "net.connman.Error.AlreadyExists");
    let (daemon, cm) = setup(daemon);

    let err = cm.connect(&secured_service(), "hunter22").await.unwrap_err();
    assert!(matches!(err, ConnmanError::Remote { .. }));
    assert_eq!(daemon.methods(), vec!["export", "RegisterAgent", "withdraw"]);
}

#[tokio::test]
async fn test_connect_without_agent_export() {
    let (daemon, cm) = setup(MockDaemon {
        refuse_export: true,
        ..Default::default()
    });

    let err = cm.connect(&secured_service(), "hunter22").await.unwrap_err();
    assert!(matches!(err, ConnmanError::AgentUnavailable(_)));
    assert!(daemon.events().is_empty());
}

#[tokio::test]
async fn test_cancelled_connect_removes_agent() {
    let (daemon, cm) = setup(MockDaemon {
        hang_on_connect: true,
        ..Default::default()
    });

    let outcome = tokio::time::timeout(
        Duration::from_millis(50),
        cm.connect(&secured_service(), "hunter22"),
    )
    .await;
    assert!(outcome.is_err());

    // Teardown runs on a spawned task once the future is dropped.
    for _ in 0..100 {
        if daemon.methods().len() >= 5 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(
        daemon.methods(),
        vec![
            "export",
            "RegisterAgent",
            "Connect",
            "UnregisterAgent",
            "withdraw"
        ]
    );
}

#[tokio::test]
async fn test_connect_open_service_skips_agent() {
    let (daemon, cm) = setup(MockDaemon::default());

    cm.connect(&open_service(), "ignored").await.unwrap();
    assert_eq!(
        daemon.events(),
        vec![Event::Call {
            path: ETH_SERVICE.into(),
            method: "Connect".into(),
            args: vec![],
        }]
    );
}

#[tokio::test]
async fn test_disconnect() {
    let (daemon, cm) = setup(MockDaemon::default());

    cm.disconnect(&open_service()).await.unwrap();
    assert_eq!(daemon.methods(), vec!["Disconnect"]);
}

#[tokio::test]
async fn test_apply_ipv4_sends_configuration_dict() {
    let (daemon, cm) = setup(MockDaemon::default());
    let mut svc = open_service();
    svc.ipv4_configuration = Ipv4Config {
        method: "manual".into(),
        address: "10.0.0.5".into(),
        netmask: "255.255.255.0".into(),
        gateway: "10.0.0.1".into(),
    };

    cm.apply_ipv4(&svc).await.unwrap();

    assert_eq!(
        daemon.events(),
        vec![Event::Set {
            path: ETH_SERVICE.into(),
            name: "IPv4.Configuration".into(),
            value: Variant::Dict(dict(vec![
                ("Method", Variant::Str("manual".into())),
                ("Address", Variant::Str("10.0.0.5".into())),
                ("Netmask", Variant::Str("255.255.255.0".into())),
                ("Gateway", Variant::Str("10.0.0.1".into())),
            ])),
        }]
    );
}

#[tokio::test]
async fn test_apply_nameservers() {
    let (daemon, cm) = setup(MockDaemon::default());
    let mut svc = open_service();
    svc.nameservers_configuration = vec!["8.8.8.8".into(), "8.8.4.4".into()];

    cm.apply_nameservers(&svc).await.unwrap();

    assert_eq!(
        daemon.events(),
        vec![Event::Set {
            path: ETH_SERVICE.into(),
            name: "Nameservers.Configuration".into(),
            value: Variant::StrList(vec!["8.8.8.8".into(), "8.8.4.4".into()]),
        }]
    );
}

#[tokio::test]
async fn test_apply_rejected_by_daemon() {
    let daemon = MockDaemon::default();
    daemon.fail("SetProperty", "net.connman.Error.InvalidArguments");
    let (_daemon, cm) = setup(daemon);

    let err = cm.apply_nameservers(&open_service()).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "net.connman.Error.InvalidArguments: SetProperty failed"
    );
}

#[tokio::test]
async fn test_enable_disable_scan_technology() {
    let (daemon, cm) = setup(MockDaemon::default());
    let tech = wifi_tech();

    cm.enable_technology(&tech).await.unwrap();
    cm.disable_technology(&tech).await.unwrap();
    cm.scan(&tech).await.unwrap();

    assert_eq!(
        daemon.events(),
        vec![
            Event::Set {
                path: WIFI_TECH.into(),
                name: "Powered".into(),
                value: Variant::Bool(true),
            },
            Event::Set {
                path: WIFI_TECH.into(),
                name: "Powered".into(),
                value: Variant::Bool(false),
            },
            Event::Call {
                path: WIFI_TECH.into(),
                method: "Scan".into(),
                args: vec![],
            },
        ]
    );
}

#[tokio::test]
async fn test_clock_properties_and_method() {
    let daemon = MockDaemon::default();
    daemon.reply(
        "/",
        "GetProperties",
        Reply::Properties(dict(vec![
            ("Time", Variant::UInt64(1_700_000_000)),
            ("TimeUpdates", Variant::Str("auto".into())),
            ("Timezone", Variant::Str("Europe/Rome".into())),
            ("TimezoneUpdates", Variant::Str("manual".into())),
            ("Timeservers", Variant::StrList(vec!["pool.ntp.org".into()])),
        ])),
    );
    let (_daemon, cm) = setup(daemon);

    let props = cm.clock_properties().await.unwrap();
    assert_eq!(props.time, 1_700_000_000);
    assert_eq!(props.timezone, "Europe/Rome");
    assert_eq!(props.timeservers, vec!["pool.ntp.org".to_string()]);

    assert_eq!(cm.time_method().await.unwrap(), "auto");
    assert_eq!(cm.time().await.method, "auto");
}

#[tokio::test]
async fn test_time_method_missing_property() {
    let daemon = MockDaemon::default();
    daemon.reply("/", "GetProperties", Reply::Properties(PropertyDict::new()));
    let (_daemon, cm) = setup(daemon);

    let err = cm.time_method().await.unwrap_err();
    assert!(matches!(err, ConnmanError::InvalidProperty(ref p) if p == "TimeUpdates"));
}

#[tokio::test]
async fn test_time_tolerates_unreachable_daemon() {
    let daemon = MockDaemon::default();
    daemon.fail("GetProperties", "org.freedesktop.DBus.Error.ServiceUnknown");
    let (_daemon, cm) = setup(daemon);

    let clock = cm.time().await;
    assert!(clock.method.is_empty());
    assert!(clock.hours < 24);
    assert!((1..=12).contains(&clock.month));
}

#[tokio::test]
async fn test_set_manual_time() {
    let (daemon, cm) = setup(MockDaemon::default());
    let clock = Clock::parse("12", "30", "2024", "6", "15").unwrap();
    let expected = clock.to_time().unwrap().timestamp() as u64;

    cm.set_manual_time(&clock).await.unwrap();

    assert_eq!(
        daemon.events(),
        vec![
            Event::Set {
                path: "/".into(),
                name: "TimeUpdates".into(),
                value: Variant::Str("manual".into()),
            },
            Event::Set {
                path: "/".into(),
                name: "Time".into(),
                value: Variant::UInt64(expected),
            },
        ]
    );
}

#[tokio::test]
async fn test_set_manual_time_rejects_invalid_date() {
    let (daemon, cm) = setup(MockDaemon::default());
    let clock = Clock {
        month: 2,
        day: 30,
        year: 2023,
        ..Default::default()
    };

    let err = cm.set_manual_time(&clock).await.unwrap_err();
    assert!(matches!(err, ConnmanError::InvalidTime(_)));
    assert!(daemon.events().is_empty());
}

#[tokio::test]
async fn test_set_auto_time() {
    let (daemon, cm) = setup(MockDaemon::default());

    cm.set_auto_time().await.unwrap();

    assert_eq!(
        daemon.events(),
        vec![Event::Set {
            path: "/".into(),
            name: "TimeUpdates".into(),
            value: Variant::Str("auto".into()),
        }]
    );
}

#[tokio::test]
async fn test_session_over_shared_bus() {
    let daemon = MockDaemon::default();
    daemon.reply(
        ETH_SERVICE,
        "GetProperties",
        Reply::Properties(dict(vec![("State", Variant::Str("ready".into()))])),
    );
    let (daemon, cm) = setup(daemon);

    let session = cm.session(ETH_SERVICE, "net.connman.Service");
    assert_eq!(session.target().interface, "net.connman.Service");
    assert_eq!(
        session.get("State").await.unwrap(),
        Variant::Str("ready".into())
    );

    let err = session.get("Nope").await.unwrap_err();
    assert!(matches!(err, ConnmanError::InvalidProperty(ref p) if p == "Nope"));

    // Shared transport stays open.
    session.close().await.unwrap();
    assert!(!daemon.events().contains(&Event::Close));

    cm.close().await.unwrap();
    assert_eq!(daemon.events().last(), Some(&Event::Close));
}

#[tokio::test]
async fn test_register_agent_explicitly() {
    let (daemon, cm) = setup(MockDaemon::default());
    let path = ObjectPath::from("/my/agent");

    cm.register_agent(&path).await.unwrap();
    cm.unregister_agent(&path).await.unwrap();

    assert_eq!(daemon.methods(), vec!["RegisterAgent", "UnregisterAgent"]);
}
