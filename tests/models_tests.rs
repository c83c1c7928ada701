// Wire decoding and frame serialization

mod common;

use clusterwatch::models::wire::{jobs_snapshot, nodes_snapshot};
use clusterwatch::models::*;
use clusterwatch::poller::Board;
use common::cluster_stat;

#[test]
fn job_list_decodes_pascal_case_and_floors_remaining() {
    let list: ItemList<JobDetails> = serde_json::from_str(
        r#"{
            "NumberOfItems": 2,
            "Items": [
                { "JobId": "a", "Type": "render", "State": "RUNNING",
                  "Progress": { "Total": 5, "Finished": 2, "Errored": 0 } },
                { "JobId": "b", "Progress": { "Total": 1, "Finished": 3, "Errored": 1 } }
            ]
        }"#,
    )
    .unwrap();
    assert_eq!(list.number_of_items, 2);
    assert_eq!(list.items[0].type_, "render");

    let snapshot = jobs_snapshot(&list);
    assert_eq!(snapshot.observations[0].value(Metric::Remaining), 3.0);
    assert_eq!(snapshot.observations[1].value(Metric::Remaining), 0.0);
}

#[test]
fn null_items_decode_as_empty_list() {
    let list: ItemList<ClusterStat> =
        serde_json::from_str(r#"{"Items":null,"NumberOfItems":0}"#).unwrap();
    assert!(list.items.is_empty());

    let jobs: ItemList<JobDetails> = serde_json::from_str(r#"{"Items":null}"#).unwrap();
    assert!(jobs_snapshot(&jobs).is_empty());

    let missing: ItemList<WorkerNode> = serde_json::from_str(r#"{"NumberOfItems":0}"#).unwrap();
    assert!(missing.items.is_empty());
}

#[test]
fn node_available_jobs_never_negative() {
    let list: ItemList<WorkerNode> = serde_json::from_str(
        r#"{ "Items": [
            { "NodeId": "n1", "MaxJobs": 2, "RunningJobs": 5 },
            { "NodeId": "", "MaxJobs": 4 }
        ] }"#,
    )
    .unwrap();
    let snapshot = nodes_snapshot(&list);
    assert_eq!(snapshot.observations.len(), 1);
    assert_eq!(snapshot.observations[0].value(Metric::AvailableJobs), 0.0);
    assert_eq!(snapshot.observations[0].value(Metric::MaxJobs), 2.0);
}

#[test]
fn missing_metric_reads_as_zero() {
    let obs = Observation::new("x").with(Metric::Total, 4.0);
    assert_eq!(obs.value(Metric::Finished), 0.0);
}

#[test]
fn metrics_belong_to_one_category() {
    for category in Category::ALL {
        assert!(category.default_metric().belongs_to(category));
    }
    assert!(!Metric::Remaining.belongs_to(Category::Nodes));
    assert!(!Metric::AvailableJobs.belongs_to(Category::Jobs));
}

#[test]
fn frame_update_is_tagged_by_type() {
    let frame = clusterwatch::series::cluster::cluster_frame(&[cluster_stat(10, 1, 2, 3)], 4, 60);
    let json = serde_json::to_value(FrameUpdate::Cluster(frame)).unwrap();
    assert_eq!(json["type"], "cluster");
    assert_eq!(json["secondsSince"], 60);
    assert_eq!(json["workerCapacity"][0]["y"], 5.0);
    assert_eq!(json["extent"]["maxY"], 5.0);
}

#[test]
fn board_keys_charts_by_category_name() {
    let history: clusterwatch::history::History =
        vec![common::nodes(&[("n1", 2.0)])].into_iter().collect();
    let options = clusterwatch::series::SeriesOptions {
        window: 2,
        metric: Metric::RunningJobs,
        filter_all_zero: true,
    };
    let mut board = Board::default();
    board.charts.insert(
        Category::Nodes,
        clusterwatch::series::build_frame(Category::Nodes, &history, &options, 1),
    );
    let json = serde_json::to_value(&board).unwrap();
    assert_eq!(json["charts"]["nodes"]["metric"], "runningJobs");
    assert!(json["cluster"].is_null());
}
