//! End-to-end facade tests against the simulated BMC

use assert_matches::assert_matches;
use oob_manager::backends::SimulatedController;
use oob_manager::{
    BmcClient, ClientCache, ClientFactory, ClientOptions, ConnectionConfig, DiskSize, Error,
    ErasePattern, Fixture, LogicalDiskSpec, MediaType, Operation, Protocol, RaidConfigRequest, RaidLevel,
    SimulatedConnector,
};
use std::io::Write;
use std::sync::Arc;

const P408: &str = "HPE Smart Array P408i-a SR Gen10";
const P816: &str = "HPE Smart Array P816i-a SR Gen10";
const S100: &str = "HPE Smart Array S100i SR Gen10";

fn gen10_fixture() -> Fixture {
    let mut fixture = Fixture::new("ProLiant DL380 Gen10");
    fixture.controllers = vec![
        SimulatedController::new(P408, "Slot 0")
            .with_drive("1I:1:1", MediaType::Hdd, 600)
            .with_drive("1I:1:2", MediaType::Hdd, 600)
            .with_drive("1I:1:3", MediaType::Hdd, 600),
        SimulatedController::new(P816, "Slot 1")
            .with_drive("2I:1:1", MediaType::Ssd, 480)
            .with_drive("2I:1:2", MediaType::Ssd, 480),
        SimulatedController::new(S100, "Embedded").with_drive("3I:1:1", MediaType::Ssd, 240),
    ];
    fixture
}

fn config() -> ConnectionConfig {
    ConnectionConfig::new("10.10.0.21", "admin", "secret")
}

async fn connect(connector: &SimulatedConnector) -> BmcClient {
    BmcClient::connect(&config(), connector, &ClientOptions::default())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_raid_lifecycle_across_controllers() {
    let connector = SimulatedConnector::new(gen10_fixture());
    let client = connect(&connector).await;

    let request = RaidConfigRequest {
        logical_disks: vec![
            LogicalDiskSpec::new(RaidLevel::Raid1, DiskSize::Gb(500))
                .with_physical_disks(["1I:1:1", "1I:1:2"]),
            LogicalDiskSpec::new(RaidLevel::Raid0, DiskSize::MAX).on_controller(P816),
        ],
    };
    client.create_raid_configuration(&request).await.unwrap();

    let config = client.read_raid_configuration(Some(&request)).await.unwrap();
    assert_eq!(config.logical_disks.len(), 2);
    assert_eq!(config.logical_disks[0].controller, P408);
    assert_eq!(config.logical_disks[0].raid_level, "1");
    assert_eq!(config.logical_disks[0].size_gb, 500);
    assert_eq!(config.logical_disks[0].physical_disks, vec!["1I:1:1", "1I:1:2"]);
    assert!(config.logical_disks[0].root_device_hint.wwn.starts_with("0x"));
    assert_eq!(config.logical_disks[1].controller, P816);
    assert_eq!(config.logical_disks[1].raid_level, "0");

    client.delete_raid_configuration().await.unwrap();
    let config = client.read_raid_configuration(None).await.unwrap();
    assert!(config.logical_disks.is_empty());

    assert_matches!(
        client.delete_raid_configuration().await,
        Err(Error::LogicalDriveNotFound(msg)) if msg.contains("Nothing to delete")
    );
    // storage operations never reach the protocol transports
    assert_eq!(
        connector.calls(),
        vec![(Protocol::Legacy, Operation::GetProductName)]
    );
}

#[tokio::test]
async fn test_create_reports_unknown_controller_after_applying_the_rest() {
    let connector = SimulatedConnector::new(gen10_fixture());
    let client = connect(&connector).await;

    let request = RaidConfigRequest {
        logical_disks: vec![
            LogicalDiskSpec::new(RaidLevel::Raid5, DiskSize::Gb(1000)),
            LogicalDiskSpec::new(RaidLevel::Raid1, DiskSize::Gb(100)).on_controller("Smart Array X"),
        ],
    };
    let err = client.create_raid_configuration(&request).await.unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("The storage controller failed to create the raid configuration"));
    assert!(message.contains("Smart Array X"));
    assert!(message.contains(P816));

    assert_eq!(connector.chassis().create_calls().len(), 1);
}

#[tokio::test]
async fn test_erase_flow() {
    let connector = SimulatedConnector::new(gen10_fixture());
    let client = connect(&connector).await;

    assert_eq!(
        client.get_available_disk_types().await.unwrap(),
        vec![MediaType::Hdd, MediaType::Ssd]
    );

    let request = RaidConfigRequest {
        logical_disks: vec![LogicalDiskSpec::new(RaidLevel::Raid1, DiskSize::Gb(500))
            .with_physical_disks(["1I:1:1", "1I:1:2"])],
    };
    client.create_raid_configuration(&request).await.unwrap();

    client.do_disk_erase(MediaType::Hdd, None).await.unwrap();
    client
        .do_disk_erase(MediaType::Ssd, Some(ErasePattern::Crypto))
        .await
        .unwrap();

    let calls = connector.chassis().erase_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].locations, vec!["1I:1:3".to_string()]);
    assert_eq!(calls[0].pattern, ErasePattern::Overwrite);
    assert_eq!(calls[1].locations, vec!["2I:1:1".to_string(), "2I:1:2".to_string()]);
    assert_eq!(calls[1].pattern, ErasePattern::Crypto);

    assert!(!client.has_disk_erase_completed().await.unwrap());
    // RAID members 1I:1:1 and 1I:1:2 were never submitted
    for location in ["1I:1:3", "2I:1:1", "2I:1:2"] {
        connector.chassis().complete_erase(location);
    }
    assert!(client.has_disk_erase_completed().await.unwrap());
}

#[tokio::test]
async fn test_mid_generation_routes_storage_to_legacy() {
    let mut fixture = gen10_fixture();
    fixture.product_name = "ProLiant DL360 Gen9".to_string();
    let connector = SimulatedConnector::new(fixture);
    let client = connect(&connector).await;

    assert_matches!(
        client.do_disk_erase(MediaType::Hdd, None).await,
        Err(Error::CommandNotSupported { protocol, .. }) if protocol == "legacy"
    );
    assert!(connector.chassis().erase_calls().is_empty());
}

#[tokio::test]
async fn test_fixture_file_with_unreachable_legacy() {
    let yaml = format!(
        r#"
product_name: ProLiant DL325 Gen10 Plus
legacy: unreachable
responses:
  get_host_power_status: "OFF"
controllers:
  - model: {}
    location: Slot 0
    drives:
      - location: "1I:1:1"
        media_type: SSD
        capacity_gb: 960
"#,
        P408
    );
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();

    let connector = SimulatedConnector::new(Fixture::from_yaml_file(file.path()).unwrap());
    let client = connect(&connector).await;

    assert_eq!(client.protocols(), vec![Protocol::Standard]);
    assert_eq!(client.get_host_power_status().await.unwrap(), "OFF");
    assert_eq!(client.get_available_disk_types().await.unwrap(), vec![MediaType::Ssd]);
}

#[test]
fn test_cache_capacity_one() {
    let connector = Arc::new(SimulatedConnector::new(gen10_fixture()));
    let options = ClientOptions {
        cache_capacity: 1,
        ..Default::default()
    };
    let cache = ClientCache::new(ClientFactory::new(connector.clone(), options).unwrap());

    tokio_test::block_on(async {
        let a = ConnectionConfig::new("10.10.0.1", "admin", "secret");
        let b = ConnectionConfig::new("10.10.0.2", "admin", "secret");
        let first = cache.get(&a).await.unwrap();
        cache.get(&b).await.unwrap();
        let again = cache.get(&a).await.unwrap();

        assert!(!Arc::ptr_eq(&first, &again));
        assert_eq!(cache.identities().await, vec![a.identity()]);
        assert_eq!(cache.stats().await.evictions, 2);
    });
}
