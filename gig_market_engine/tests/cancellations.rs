use gig_market_engine::{
    db_types::{Credits, NewOrder, OrderStatusType},
    traits::MarketplaceError,
};

mod support;
use support::{seed_marketplace, setup, tear_down};

#[tokio::test]
async fn mutual_cancellation_refunds_the_client() {
    let (api, ledger) = setup().await;
    let actors = seed_marketplace(&api, 1000, 350).await;
    let order = api
        .place_order(NewOrder::new(actors.gig.id, actors.client.id, "a thing"))
        .await
        .expect("Error placing order");
    api.start_order(order.id, actors.freelancer.id).await.unwrap();

    let order = api
        .request_cancellation(order.id, actors.client.id, "Changed my mind")
        .await
        .expect("Error requesting cancellation");
    assert_eq!(order.status, OrderStatusType::CancellationRequested);
    assert_eq!(order.cancellation_requested_by, Some(actors.client.id));
    assert_eq!(order.cancellation_reason.as_deref(), Some("Changed my mind"));

    // The requester cannot rubber-stamp their own request.
    let err = api.approve_cancellation(order.id, actors.client.id).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::Forbidden(_)));

    let order = api.approve_cancellation(order.id, actors.freelancer.id).await.expect("Error approving cancellation");
    assert_eq!(order.status, OrderStatusType::Cancelled);
    assert_eq!(ledger.balance(actors.client.id).await.unwrap(), Credits::from(1000));
    assert_eq!(ledger.balance(actors.freelancer.id).await.unwrap(), Credits::zero());
    let refund = ledger.refund_log(order.id).await.unwrap().expect("Refund log entry missing");
    assert_eq!(refund.amount, Credits::from(350));

    // The refund was settled inline; a reconciliation pass finds nothing left to do.
    let summary = api.reconcile_settlements().await.unwrap();
    assert!(summary.is_empty());
    assert_eq!(ledger.balance(actors.client.id).await.unwrap(), Credits::from(1000));
    tear_down(api).await;
}

#[tokio::test]
async fn rejected_cancellation_resumes_work() {
    let (api, ledger) = setup().await;
    let actors = seed_marketplace(&api, 1000, 200).await;
    let order = api
        .place_order(NewOrder::new(actors.gig.id, actors.client.id, "a thing"))
        .await
        .expect("Error placing order");
    api.start_order(order.id, actors.freelancer.id).await.unwrap();

    api.request_cancellation(order.id, actors.freelancer.id, "Overcommitted this week").await.unwrap();
    let err = api.reject_cancellation(order.id, actors.freelancer.id).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::Forbidden(_)));

    let order = api.reject_cancellation(order.id, actors.client.id).await.expect("Error rejecting cancellation");
    assert_eq!(order.status, OrderStatusType::InProgress);
    // Escrow is untouched by the round trip.
    assert_eq!(ledger.balance(actors.client.id).await.unwrap(), Credits::from(800));
    assert!(ledger.refund_log(order.id).await.unwrap().is_none());
    tear_down(api).await;
}

#[tokio::test]
async fn pending_orders_still_need_counterpart_approval() {
    let (api, _ledger) = setup().await;
    let actors = seed_marketplace(&api, 1000, 200).await;
    let order = api
        .place_order(NewOrder::new(actors.gig.id, actors.client.id, "a thing"))
        .await
        .expect("Error placing order");

    // Not late, so no short-circuit even for the client.
    let order = api.request_cancellation(order.id, actors.client.id, "Ordered by mistake").await.unwrap();
    assert_eq!(order.status, OrderStatusType::CancellationRequested);
    tear_down(api).await;
}

#[tokio::test]
async fn strangers_cannot_request_cancellation() {
    let (api, _ledger) = setup().await;
    let actors = seed_marketplace(&api, 1000, 200).await;
    let order = api
        .place_order(NewOrder::new(actors.gig.id, actors.client.id, "a thing"))
        .await
        .expect("Error placing order");

    let stranger = gig_market_engine::db_types::UserId::from(9999);
    let err = api.request_cancellation(order.id, stranger, "not my order").await.unwrap_err();
    assert!(matches!(err, MarketplaceError::Forbidden(_)));
    tear_down(api).await;
}
