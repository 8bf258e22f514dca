use std::time::Duration;

use gig_market_engine::{
    db_types::{Credits, NewOrder, OrderStatusType},
    events::EventProducers,
    order_objects::OrderQueryFilter,
    test_utils::prepare_env::backdate_order,
    workers::start_sweeper_worker,
};

mod support;
use support::{seed_marketplace, setup, tear_down};

#[tokio::test]
async fn sweep_marks_overdue_orders_and_is_idempotent() {
    let (api, ledger) = setup().await;
    let actors = seed_marketplace(&api, 1000, 100).await;
    let on_time = api
        .place_order(NewOrder::new(actors.gig.id, actors.client.id, "order one"))
        .await
        .expect("Error placing order");
    let overdue = api
        .place_order(NewOrder::new(actors.gig.id, actors.client.id, "order two"))
        .await
        .expect("Error placing order");
    api.start_order(overdue.id, actors.freelancer.id).await.unwrap();
    backdate_order(api.db(), overdue.id, 3).await;

    let late = api.sweep_late_orders().await.expect("Error sweeping");
    assert_eq!(late.len(), 1);
    assert_eq!(late[0].id, overdue.id);
    assert_eq!(late[0].status, OrderStatusType::Late);
    assert!(late[0].is_late);

    // A second sweep finds nothing new; already-late orders are never touched again.
    let late = api.sweep_late_orders().await.expect("Error sweeping");
    assert!(late.is_empty());
    let on_time = ledger.order(on_time.id).await.unwrap();
    assert!(!on_time.is_late);
    assert_eq!(on_time.status, OrderStatusType::Pending);
    tear_down(api).await;
}

#[tokio::test]
async fn sweeper_worker_marks_orders_late_on_its_own() {
    let (api, ledger) = setup().await;
    let actors = seed_marketplace(&api, 1000, 100).await;
    let order = api
        .place_order(NewOrder::new(actors.gig.id, actors.client.id, "background job"))
        .await
        .expect("Error placing order");
    api.start_order(order.id, actors.freelancer.id).await.unwrap();
    backdate_order(api.db(), order.id, 1).await;

    let worker = start_sweeper_worker(api.db().clone(), EventProducers::default(), Duration::from_millis(50));
    tokio::time::sleep(Duration::from_millis(300)).await;
    let order = ledger.order(order.id).await.unwrap();
    assert!(order.is_late);
    assert_eq!(order.status, OrderStatusType::Late);
    worker.abort();
    tear_down(api).await;
}

#[tokio::test]
async fn order_search_filters_compose() {
    let (api, ledger) = setup().await;
    let actors = seed_marketplace(&api, 1000, 100).await;
    let started = api.place_order(NewOrder::new(actors.gig.id, actors.client.id, "one")).await.unwrap();
    api.start_order(started.id, actors.freelancer.id).await.unwrap();
    let pending = api.place_order(NewOrder::new(actors.gig.id, actors.client.id, "two")).await.unwrap();
    let overdue = api.place_order(NewOrder::new(actors.gig.id, actors.client.id, "three")).await.unwrap();
    api.start_order(overdue.id, actors.freelancer.id).await.unwrap();
    backdate_order(api.db(), overdue.id, 2).await;
    api.sweep_late_orders().await.unwrap();

    let found = ledger.search_orders(OrderQueryFilter::default().with_client_id(actors.client.id)).await.unwrap();
    assert_eq!(found.len(), 3);
    let found = ledger.search_orders(OrderQueryFilter::default().with_status(OrderStatusType::Pending)).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, pending.id);
    let found = ledger
        .search_orders(OrderQueryFilter::default().with_freelancer_id(actors.freelancer.id).late_only())
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, overdue.id);
    let found = ledger
        .search_orders(
            OrderQueryFilter::default().with_status(OrderStatusType::InProgress).with_status(OrderStatusType::Late),
        )
        .await
        .unwrap();
    assert_eq!(found.len(), 2);
    tear_down(api).await;
}

#[tokio::test]
async fn client_cancelling_a_late_order_is_refunded_immediately() {
    let (api, ledger) = setup().await;
    let actors = seed_marketplace(&api, 1000, 450).await;
    let order = api
        .place_order(NewOrder::new(actors.gig.id, actors.client.id, "urgent job"))
        .await
        .expect("Error placing order");
    api.start_order(order.id, actors.freelancer.id).await.unwrap();
    backdate_order(api.db(), order.id, 1).await;
    api.sweep_late_orders().await.unwrap();

    // No counterpart approval needed: the freelancer blew the deadline.
    let order = api
        .request_cancellation(order.id, actors.client.id, "Deadline missed")
        .await
        .expect("Error cancelling late order");
    assert_eq!(order.status, OrderStatusType::Cancelled);
    assert_eq!(order.cancellation_approved, Some(true));
    assert_eq!(ledger.balance(actors.client.id).await.unwrap(), Credits::from(1000));
    assert!(ledger.refund_log(order.id).await.unwrap().is_some());

    let summary = api.reconcile_settlements().await.unwrap();
    assert!(summary.is_empty());
    tear_down(api).await;
}

#[tokio::test]
async fn freelancer_cancelling_a_late_order_still_needs_approval() {
    let (api, ledger) = setup().await;
    let actors = seed_marketplace(&api, 1000, 100).await;
    let order = api
        .place_order(NewOrder::new(actors.gig.id, actors.client.id, "a job"))
        .await
        .expect("Error placing order");
    api.start_order(order.id, actors.freelancer.id).await.unwrap();
    backdate_order(api.db(), order.id, 1).await;
    api.sweep_late_orders().await.unwrap();

    let order = api
        .request_cancellation(order.id, actors.freelancer.id, "Cannot finish this")
        .await
        .expect("Error requesting cancellation");
    assert_eq!(order.status, OrderStatusType::CancellationRequested);
    assert_eq!(ledger.balance(actors.client.id).await.unwrap(), Credits::from(900));

    let order = api.approve_cancellation(order.id, actors.client.id).await.unwrap();
    assert_eq!(order.status, OrderStatusType::Cancelled);
    assert_eq!(ledger.balance(actors.client.id).await.unwrap(), Credits::from(1000));
    tear_down(api).await;
}

#[tokio::test]
async fn late_orders_can_still_be_delivered_and_completed() {
    let (api, ledger) = setup().await;
    let actors = seed_marketplace(&api, 1000, 150).await;
    let order = api
        .place_order(NewOrder::new(actors.gig.id, actors.client.id, "slow but good"))
        .await
        .expect("Error placing order");
    api.start_order(order.id, actors.freelancer.id).await.unwrap();
    backdate_order(api.db(), order.id, 2).await;
    api.sweep_late_orders().await.unwrap();

    let order = api
        .deliver_order(order.id, actors.freelancer.id, "late-but-done.zip", "Sorry for the delay")
        .await
        .expect("A late order is still deliverable");
    assert_eq!(order.status, OrderStatusType::Delivered);
    // The late flag survives the transition for bookkeeping.
    assert!(order.is_late);

    let order = api.approve_delivery(order.id, actors.client.id).await.unwrap();
    assert_eq!(order.status, OrderStatusType::Completed);
    assert_eq!(ledger.balance(actors.freelancer.id).await.unwrap(), Credits::from(150));
    tear_down(api).await;
}
