//! End-to-end wallet flow without a network: create a wallet, ingest
//! history, check balances, build and sign a spend, mine it and check
//! the final bytes.

use std::sync::Arc;

use tempfile::TempDir;

use wallet::node::events::NullSubscriber;
use wallet::node::types::{AddressHistory, HistoryItem};
use wallet::pow;
use wallet::tx::codec;
use wallet::{SendOutput, Storage, TokenUid, WalletConfig, WalletManager};

const WORDS: &str = "purse orchard camera cloud piece joke hospital mechanic timber horror \
                     shoulder rebuild you decrease garlic derive rebuild random naive elbow \
                     depart okay parrot cliff";
const PIN: &str = "123456";
const PASSWORD: &str = "password";
const FUNDING_TX: &str = "00034a15973117852c45520af9e4296c68adb9d39dc99a0342e23cd6686b295e";

struct TestEnvironment {
    _temp_dir: TempDir,
    manager: WalletManager,
}

impl TestEnvironment {
    fn new() -> anyhow::Result<Self> {
        env_logger::builder().is_test(true).try_init().ok();

        let temp_dir = TempDir::new()?;
        let storage = Storage::new_with_base_dir(temp_dir.path().to_path_buf());
        let mut manager =
            WalletManager::new(WalletConfig::default(), storage, Arc::new(NullSubscriber));
        manager.create_wallet("test-wallet", WORDS, "", PIN, PASSWORD)?;

        Ok(Self {
            _temp_dir: temp_dir,
            manager,
        })
    }

    fn fund_first_address(&mut self, value: u64) -> anyhow::Result<String> {
        let address = self.manager.book().address_at(0).unwrap().to_string();
        self.manager.ingest_history(&[AddressHistory {
            address: address.clone(),
            history: vec![HistoryItem {
                tx_id: FUNDING_TX.to_string(),
                index: 0,
                is_output: true,
                token_uid: TokenUid::native(),
                value,
                timestamp: 1549023313,
                timelock: None,
                voided: false,
                from_tx_id: None,
            }],
        }])?;
        Ok(address)
    }
}

#[test]
fn test_history_ingestion_updates_balance() -> anyhow::Result<()> {
    let mut env = TestEnvironment::new()?;
    env.fund_first_address(2000)?;

    let balance = env.manager.balance(&TokenUid::native());
    assert_eq!(balance.available, 2000);
    assert_eq!(balance.locked, 0);
    Ok(())
}

#[test]
fn test_build_sign_and_mine_spend() -> anyhow::Result<()> {
    let mut env = TestEnvironment::new()?;
    env.fund_first_address(2000)?;

    let outputs = [SendOutput {
        address: "H8rodtbo5TcfUkRBs6ujQTg2u1Re3xVZ11".to_string(),
        value: 1300,
        timelock: None,
    }];
    let mut tx = env
        .manager
        .build_send_transaction(&outputs, &TokenUid::native(), PIN)?;

    // One input from the funding tx, the paid output plus change
    assert_eq!(tx.inputs.len(), 1);
    assert_eq!(tx.inputs[0].tx_id, FUNDING_TX);
    assert!(!tx.inputs[0].data.is_empty());
    assert_eq!(tx.outputs.len(), 2);
    assert_eq!(tx.outputs[1].value, 700);
    assert!(env.manager.book().contains(&tx.outputs[1].address));
    assert!(tx.weight >= env.manager.config().weights.min_tx_weight);

    // Resolve parents (normally fetched from the node) and mine with an
    // easy target so the test finishes instantly
    tx.parents = vec!["11".repeat(32), "22".repeat(32)];
    tx.weight = 1.0;
    let params = env.manager.config().network.clone();
    let mined = pow::solve(&mut tx, &params, u32::MAX)?;
    tx.nonce = mined.nonce;
    tx.timestamp = mined.timestamp;

    let bytes = codec::tx_bytes(&tx, &params)?;
    // The mined nonce closes the serialized transaction
    assert_eq!(&bytes[bytes.len() - 4..], &mined.nonce.to_be_bytes());
    // And the graph segment carries both parents
    assert_eq!(hex::encode(&bytes).matches(&"11".repeat(32)).count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_solver_runs_off_the_caller_task() -> anyhow::Result<()> {
    let mut env = TestEnvironment::new()?;
    env.fund_first_address(2000)?;

    let outputs = [SendOutput {
        address: "H8rodtbo5TcfUkRBs6ujQTg2u1Re3xVZ11".to_string(),
        value: 2000,
        timelock: None,
    }];
    let mut tx = env
        .manager
        .build_send_transaction(&outputs, &TokenUid::native(), PIN)?;
    tx.parents = vec!["11".repeat(32), "22".repeat(32)];
    tx.weight = 1.0;

    let params = env.manager.config().network.clone();
    let mined = pow::spawn(tx, params, u32::MAX).wait().await?;
    assert!(mined.timestamp > 0);
    Ok(())
}

#[test]
fn test_insufficient_funds_is_rejected() -> anyhow::Result<()> {
    let mut env = TestEnvironment::new()?;
    env.fund_first_address(500)?;

    let outputs = [SendOutput {
        address: "H8rodtbo5TcfUkRBs6ujQTg2u1Re3xVZ11".to_string(),
        value: 800,
        timelock: None,
    }];
    let result = env
        .manager
        .build_send_transaction(&outputs, &TokenUid::native(), PIN);
    assert!(matches!(
        result,
        Err(wallet::WalletError::InsufficientFunds(_))
    ));
    Ok(())
}

#[test]
fn test_spending_wrong_token_finds_no_inputs() -> anyhow::Result<()> {
    let mut env = TestEnvironment::new()?;
    env.fund_first_address(2000)?;

    let outputs = [SendOutput {
        address: "H8rodtbo5TcfUkRBs6ujQTg2u1Re3xVZ11".to_string(),
        value: 100,
        timelock: None,
    }];
    let result =
        env.manager
            .build_send_transaction(&outputs, &TokenUid::new("ab".repeat(32)), PIN);
    assert!(matches!(
        result,
        Err(wallet::WalletError::InsufficientFunds(_))
    ));
    Ok(())
}

#[test]
fn test_ledger_survives_reload() -> anyhow::Result<()> {
    let mut env = TestEnvironment::new()?;
    env.fund_first_address(2000)?;
    let before = env.manager.ledger().clone();

    let storage = Storage::new_with_base_dir(env._temp_dir.path().to_path_buf());
    let mut reloaded =
        WalletManager::new(WalletConfig::default(), storage, Arc::new(NullSubscriber));
    reloaded.load_wallet("test-wallet")?;

    assert_eq!(reloaded.ledger(), &before);
    assert_eq!(reloaded.balance(&TokenUid::native()).available, 2000);
    Ok(())
}
