use gig_market_engine::{
    db_types::{Credits, NewGig, NewOrder, NewUser, OrderStatusType, Role},
    traits::MarketplaceError,
};

mod support;
use support::{seed_marketplace, setup, tear_down};

#[tokio::test]
async fn happy_path_releases_escrow_to_freelancer() {
    let (api, ledger) = setup().await;
    let actors = seed_marketplace(&api, 1000, 250).await;

    let order = api
        .place_order(NewOrder::new(actors.gig.id, actors.client.id, "A round logo please"))
        .await
        .expect("Error placing order");
    assert_eq!(order.status, OrderStatusType::Pending);
    assert_eq!(order.price, Credits::from(250));
    assert_eq!(ledger.balance(actors.client.id).await.unwrap(), Credits::from(750));

    let order = api.start_order(order.id, actors.freelancer.id).await.expect("Error starting order");
    assert_eq!(order.status, OrderStatusType::InProgress);

    let order = api
        .deliver_order(order.id, actors.freelancer.id, "s3://deliveries/logo-final.zip", "Final version attached")
        .await
        .expect("Error delivering order");
    assert_eq!(order.status, OrderStatusType::Delivered);
    assert_eq!(order.delivery_file.as_deref(), Some("s3://deliveries/logo-final.zip"));
    assert_eq!(order.delivery_notes.as_deref(), Some("Final version attached"));

    let order = api.approve_delivery(order.id, actors.client.id).await.expect("Error approving delivery");
    assert_eq!(order.status, OrderStatusType::Completed);
    assert_eq!(ledger.balance(actors.freelancer.id).await.unwrap(), Credits::from(250));
    // Conservation: nothing was created or destroyed, just moved.
    let total = ledger.balance(actors.client.id).await.unwrap() + ledger.balance(actors.freelancer.id).await.unwrap();
    assert_eq!(total, Credits::from(1000));

    let transfer = ledger.transfer_log(order.id).await.unwrap().expect("Transfer log entry missing");
    assert_eq!(transfer.amount, Credits::from(250));
    assert_eq!(transfer.from_user_id, actors.client.id);
    assert_eq!(transfer.to_user_id, actors.freelancer.id);
    assert!(ledger.refund_log(order.id).await.unwrap().is_none());
    tear_down(api).await;
}

#[tokio::test]
async fn order_fails_when_client_cannot_cover_price() {
    let (api, ledger) = setup().await;
    let actors = seed_marketplace(&api, 100, 250).await;

    let err = api
        .place_order(NewOrder::new(actors.gig.id, actors.client.id, "champagne on a beer budget"))
        .await
        .expect_err("Order should have been rejected");
    assert!(matches!(err, MarketplaceError::InsufficientFunds(id, price)
        if id == actors.client.id && price == Credits::from(250)));
    // The failed debit must not have touched the balance.
    assert_eq!(ledger.balance(actors.client.id).await.unwrap(), Credits::from(100));
    assert!(ledger.orders_for_user(actors.client.id).await.unwrap().is_empty());
    tear_down(api).await;
}

#[tokio::test]
async fn registrations_are_immediately_visible_to_other_connections() {
    let (api, ledger) = setup().await;
    // Each write must be durable before the call returns: the very next statement runs on a
    // different pool connection and has to see the row.
    for i in 0..10 {
        let client = api
            .register_user(
                NewUser::new(format!("client{i}"), format!("client{i}@example.com"), Role::Client)
                    .with_balance(Credits::from(100)),
            )
            .await
            .expect("Error registering client");
        assert_eq!(ledger.balance(client.id).await.unwrap(), Credits::from(100));
        let freelancer = api
            .register_user(NewUser::new(format!("fl{i}"), format!("fl{i}@example.com"), Role::Freelancer))
            .await
            .expect("Error registering freelancer");
        let gig = api
            .register_gig(NewGig::new("Quick gig", Credits::from(50), freelancer.id))
            .await
            .expect("Error registering gig");
        let order = api
            .place_order(NewOrder::new(gig.id, client.id, "right away"))
            .await
            .expect("The gig registered a moment ago must be orderable");
        assert_eq!(order.price, Credits::from(50));
        let topped_up = api.credit_user(client.id, Credits::from(25)).await.expect("Error topping up");
        assert_eq!(ledger.balance(client.id).await.unwrap(), topped_up.balance);
    }
    tear_down(api).await;
}

#[tokio::test]
async fn non_positive_amounts_are_rejected() {
    let (api, ledger) = setup().await;
    let actors = seed_marketplace(&api, 100, 100).await;

    let err = api.credit_user(actors.client.id, Credits::zero()).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::InvalidAmount(_)));
    let err = api.credit_user(actors.client.id, Credits::from(-5)).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::InvalidAmount(a) if a == Credits::from(-5)));
    let err = api.register_gig(NewGig::new("Free lunch", Credits::zero(), actors.freelancer.id)).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::InvalidAmount(_)));
    assert_eq!(ledger.balance(actors.client.id).await.unwrap(), Credits::from(100));
    tear_down(api).await;
}

#[tokio::test]
async fn an_exact_balance_is_sufficient() {
    let (api, ledger) = setup().await;
    let actors = seed_marketplace(&api, 100, 100).await;

    let order = api
        .place_order(NewOrder::new(actors.gig.id, actors.client.id, "all in"))
        .await
        .expect("Error placing order");
    assert_eq!(order.status, OrderStatusType::Pending);
    assert_eq!(ledger.balance(actors.client.id).await.unwrap(), Credits::zero());
    tear_down(api).await;
}

#[tokio::test]
async fn transitions_out_of_order_are_rejected() {
    let (api, _ledger) = setup().await;
    let actors = seed_marketplace(&api, 1000, 100).await;
    let order =
        api.place_order(NewOrder::new(actors.gig.id, actors.client.id, "anything")).await.expect("Error placing order");

    // Deliver and approve both require work to have progressed further than `pending`.
    let err = api.deliver_order(order.id, actors.freelancer.id, "file", "notes").await.unwrap_err();
    assert!(matches!(err, MarketplaceError::InvalidTransition { from: OrderStatusType::Pending, .. }));
    let err = api.approve_delivery(order.id, actors.client.id).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::InvalidTransition { from: OrderStatusType::Pending, .. }));
    tear_down(api).await;
}

#[tokio::test]
async fn delivery_requires_file_and_notes() {
    let (api, _ledger) = setup().await;
    let actors = seed_marketplace(&api, 1000, 100).await;
    let order =
        api.place_order(NewOrder::new(actors.gig.id, actors.client.id, "anything")).await.expect("Error placing order");
    let order = api.start_order(order.id, actors.freelancer.id).await.expect("Error starting order");

    let err = api.deliver_order(order.id, actors.freelancer.id, "", "notes").await.unwrap_err();
    assert!(matches!(err, MarketplaceError::DeliveryPayloadMissing(id) if id == order.id));
    let err = api.deliver_order(order.id, actors.freelancer.id, "file", "  ").await.unwrap_err();
    assert!(matches!(err, MarketplaceError::DeliveryPayloadMissing(_)));
    tear_down(api).await;
}

#[tokio::test]
async fn rejected_delivery_reopens_the_order() {
    let (api, ledger) = setup().await;
    let actors = seed_marketplace(&api, 1000, 300).await;
    let order = api
        .place_order(NewOrder::new(actors.gig.id, actors.client.id, "three revisions included"))
        .await
        .expect("Error placing order");
    api.start_order(order.id, actors.freelancer.id).await.unwrap();
    api.deliver_order(order.id, actors.freelancer.id, "v1.zip", "first attempt").await.unwrap();

    let order = api.reject_delivery(order.id, actors.client.id).await.expect("Error rejecting delivery");
    assert_eq!(order.status, OrderStatusType::InProgress);
    // Escrow stays put until the client is satisfied.
    assert_eq!(ledger.balance(actors.freelancer.id).await.unwrap(), Credits::zero());

    api.deliver_order(order.id, actors.freelancer.id, "v2.zip", "second attempt").await.unwrap();
    let order = api.approve_delivery(order.id, actors.client.id).await.unwrap();
    assert_eq!(order.status, OrderStatusType::Completed);
    assert_eq!(order.delivery_file.as_deref(), Some("v2.zip"));
    assert_eq!(ledger.balance(actors.freelancer.id).await.unwrap(), Credits::from(300));
    tear_down(api).await;
}

#[tokio::test]
async fn only_the_right_party_may_act() {
    let (api, _ledger) = setup().await;
    let actors = seed_marketplace(&api, 1000, 100).await;
    let order =
        api.place_order(NewOrder::new(actors.gig.id, actors.client.id, "anything")).await.expect("Error placing order");

    // The client cannot accept their own order on the freelancer's behalf.
    let err = api.start_order(order.id, actors.client.id).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::Forbidden(_)));
    api.start_order(order.id, actors.freelancer.id).await.unwrap();
    api.deliver_order(order.id, actors.freelancer.id, "file", "notes").await.unwrap();
    // And the freelancer cannot approve their own delivery.
    let err = api.approve_delivery(order.id, actors.freelancer.id).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::Forbidden(_)));
    tear_down(api).await;
}

#[tokio::test]
async fn approving_twice_credits_once() {
    let (api, ledger) = setup().await;
    let actors = seed_marketplace(&api, 1000, 400).await;
    let order =
        api.place_order(NewOrder::new(actors.gig.id, actors.client.id, "anything")).await.expect("Error placing order");
    api.start_order(order.id, actors.freelancer.id).await.unwrap();
    api.deliver_order(order.id, actors.freelancer.id, "file", "notes").await.unwrap();

    api.approve_delivery(order.id, actors.client.id).await.expect("First approval should succeed");
    let err = api.approve_delivery(order.id, actors.client.id).await.unwrap_err();
    assert!(matches!(err, MarketplaceError::InvalidTransition { from: OrderStatusType::Completed, .. }));
    assert_eq!(ledger.balance(actors.freelancer.id).await.unwrap(), Credits::from(400));
    tear_down(api).await;
}
