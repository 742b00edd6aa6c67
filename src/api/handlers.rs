use actix_web::{web, HttpResponse, Responder};
use log::error;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::blockchain::{Address, DigitalSignature, Transaction};
use crate::node::{ChainSnapshot, Node, NodeError};

/// Shared node handle
pub type NodeData = web::Data<Node>;

/// Form fields for the transaction endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct TransactionForm {
    /// The sender's public key, hex encoded
    pub sender: String,

    /// The payload
    pub value: String,

    /// Signature over `{sender, value}`, hex encoded
    pub signature: String,
}

/// Response for the pending transactions endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct PendingResponse {
    /// Transactions waiting to be sealed
    pub transactions: Vec<Transaction>,
}

/// Request for the register nodes endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct RegisterNodesRequest {
    /// Peer addresses as `host:port`
    pub nodes: Vec<String>,
}

/// Response for the register nodes endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct RegisterNodesResponse {
    /// The message
    pub message: String,

    /// All known peers after registration
    pub total_nodes: Vec<String>,
}

/// Response for the node info endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct NodeInfoResponse {
    /// Random identifier of this node
    pub node_id: String,

    /// Known peers
    pub peers: Vec<String>,

    /// The length of the local chain
    pub length: usize,
}

/// Submit a signed transaction
///
/// Verifies the signature and seals the transaction into a new block. The
/// status is 200 even when the transaction is rejected; the body tells.
#[utoipa::path(
    post,
    path = "/transactions/new",
    request_body(content = TransactionForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Whether the transaction was accepted", body = bool)
    )
)]
pub async fn new_transaction(node: NodeData, form: web::Form<TransactionForm>) -> impl Responder {
    let form = form.into_inner();
    let transaction = Transaction::new(
        Address(form.sender),
        form.value,
        DigitalSignature(form.signature),
    );

    let accepted = submission_outcome(node.submit_transaction(transaction).await);
    HttpResponse::Ok().json(accepted)
}

/// Sealing failures surface to clients as a plain rejection
fn submission_outcome(result: Result<bool, NodeError>) -> bool {
    match result {
        Ok(accepted) => accepted,
        Err(err) => {
            error!("Failed to seal transaction: {}", err);
            false
        }
    }
}

/// Get the full blockchain
#[utoipa::path(
    get,
    path = "/chain",
    responses(
        (status = 200, description = "Blockchain retrieved successfully", body = ChainSnapshot)
    )
)]
pub async fn get_chain(node: NodeData) -> impl Responder {
    let (chain, length) = node.get_chain().await;
    HttpResponse::Ok().json(ChainSnapshot { chain, length })
}

/// Get all pending transactions
#[utoipa::path(
    get,
    path = "/transactions/get",
    responses(
        (status = 200, description = "Pending transactions retrieved successfully", body = PendingResponse)
    )
)]
pub async fn get_pending_transactions(node: NodeData) -> impl Responder {
    let transactions = node.get_pending_transactions().await;
    HttpResponse::Ok().json(PendingResponse { transactions })
}

/// Reconcile with peers
///
/// Adopts the longest valid chain among peers if it is longer than ours.
#[utoipa::path(
    get,
    path = "/update",
    responses(
        (status = 200, description = "Reconciliation finished", body = bool)
    )
)]
pub async fn update_chain(node: NodeData) -> impl Responder {
    HttpResponse::Ok().json(node.reconcile().await)
}

/// Check if the local blockchain is valid
#[utoipa::path(
    get,
    path = "/validate",
    responses(
        (status = 200, description = "Blockchain validation status", body = bool)
    )
)]
pub async fn validate_chain(node: NodeData) -> impl Responder {
    HttpResponse::Ok().json(node.is_valid().await)
}

/// Register peers
#[utoipa::path(
    post,
    path = "/nodes/register",
    request_body = RegisterNodesRequest,
    responses(
        (status = 201, description = "Peers registered", body = RegisterNodesResponse),
        (status = 400, description = "No peers supplied")
    )
)]
pub async fn register_nodes(node: NodeData, request: web::Json<RegisterNodesRequest>) -> impl Responder {
    let nodes = request.into_inner().nodes;
    if nodes.iter().all(|address| address.trim().is_empty()) {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "Please supply a valid list of nodes"
        }));
    }

    let total_nodes = node.register_peers(nodes).await;
    HttpResponse::Created().json(RegisterNodesResponse {
        message: "New nodes have been added".to_string(),
        total_nodes,
    })
}

/// Describe this node
#[utoipa::path(
    get,
    path = "/node",
    responses(
        (status = 200, description = "Node information", body = NodeInfoResponse)
    )
)]
pub async fn node_info(node: NodeData) -> impl Responder {
    let (_, length) = node.get_chain().await;

    HttpResponse::Ok().json(NodeInfoResponse {
        node_id: node.id().to_string(),
        peers: node.peers().await,
        length,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{test, App};

    use super::*;
    use crate::api::configure_routes;
    use crate::blockchain::{Block, ProofOfWork, Wallet};
    use crate::node::peer::mock::MockPeerClient;
    use crate::node::PeerSet;

    fn node_data() -> NodeData {
        web::Data::new(Node::new(
            ProofOfWork::default(),
            PeerSet::default(),
            Arc::new(MockPeerClient::default()),
        ))
    }

    fn form_for(transaction: &Transaction) -> TransactionForm {
        TransactionForm {
            sender: transaction.sender.0.clone(),
            value: transaction.value.clone(),
            signature: transaction.signature.0.clone(),
        }
    }

    #[actix_web::test]
    async fn test_submit_then_read_chain() {
        let data = node_data();
        let app = test::init_service(App::new().app_data(data.clone()).configure(configure_routes)).await;

        let transaction = Transaction::signed(&Wallet::new(), "42");
        let req = test::TestRequest::post()
            .uri("/transactions/new")
            .set_form(form_for(&transaction))
            .to_request();
        let accepted: bool = test::call_and_read_body_json(&app, req).await;
        assert!(accepted);

        let req = test::TestRequest::get().uri("/chain").to_request();
        let snapshot: ChainSnapshot = test::call_and_read_body_json(&app, req).await;
        assert_eq!(snapshot.length, 2);
        assert_eq!(snapshot.chain[1].transactions, vec![transaction]);
        assert_eq!(snapshot.chain[1].previous_hash, Block::genesis().hash());

        let req = test::TestRequest::get().uri("/transactions/get").to_request();
        let pending: PendingResponse = test::call_and_read_body_json(&app, req).await;
        assert!(pending.transactions.is_empty());
    }

    #[actix_web::test]
    async fn test_rejected_transaction_still_returns_ok() {
        let app = test::init_service(App::new().app_data(node_data()).configure(configure_routes)).await;

        let owner = Wallet::new();
        let impostor = Wallet::new();
        let form = TransactionForm {
            sender: owner.address().0.clone(),
            value: "42".to_string(),
            signature: impostor
                .sign(&Transaction::signing_message(owner.address(), "42"))
                .0,
        };

        let req = test::TestRequest::post()
            .uri("/transactions/new")
            .set_form(form)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        let accepted: bool = test::read_body_json(resp).await;
        assert!(!accepted);

        let req = test::TestRequest::get().uri("/chain").to_request();
        let snapshot: ChainSnapshot = test::call_and_read_body_json(&app, req).await;
        assert_eq!(snapshot.length, 1);
    }

    #[actix_web::test]
    async fn test_update_and_validate() {
        let app = test::init_service(App::new().app_data(node_data()).configure(configure_routes)).await;

        let req = test::TestRequest::get().uri("/update").to_request();
        let result: bool = test::call_and_read_body_json(&app, req).await;
        assert!(result);

        let req = test::TestRequest::get().uri("/validate").to_request();
        let result: bool = test::call_and_read_body_json(&app, req).await;
        assert!(result);
    }

    #[actix_web::test]
    async fn test_register_nodes() {
        let app = test::init_service(App::new().app_data(node_data()).configure(configure_routes)).await;

        let req = test::TestRequest::post()
            .uri("/nodes/register")
            .set_json(RegisterNodesRequest {
                nodes: vec!["127.0.0.1:5001".to_string()],
            })
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 201);
        let body: RegisterNodesResponse = test::read_body_json(resp).await;
        assert_eq!(body.total_nodes, vec!["127.0.0.1:5001"]);

        let req = test::TestRequest::post()
            .uri("/nodes/register")
            .set_json(RegisterNodesRequest { nodes: Vec::new() })
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);

        let req = test::TestRequest::get().uri("/node").to_request();
        let info: NodeInfoResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(info.peers, vec!["127.0.0.1:5001"]);
        assert_eq!(info.length, 1);
    }

    #[actix_web::test]
    async fn test_missing_form_field_is_client_error() {
        let app = test::init_service(App::new().app_data(node_data()).configure(configure_routes)).await;

        let req = test::TestRequest::post()
            .uri("/transactions/new")
            .set_form([("sender", "abc"), ("value", "42")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_client_error());
    }

    #[tokio::test]
    async fn test_sealing_failures_answer_false() {
        let crashed: tokio::task::JoinHandle<()> = tokio::spawn(async { panic!("miner crashed") });
        let join_error = crashed.await.unwrap_err();

        assert!(!submission_outcome(Err(NodeError::Mining(join_error))));
        assert!(!submission_outcome(Err(NodeError::NoProof)));
        assert!(submission_outcome(Ok(true)));
        assert!(!submission_outcome(Ok(false)));
    }
}
