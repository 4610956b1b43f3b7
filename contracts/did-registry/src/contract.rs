use cosmwasm_std::{
    entry_point, to_json_binary, Binary, Deps, DepsMut, Env, MessageInfo, Response,
};
use cw2::set_contract_version;

use crate::auth::validate_key;
use crate::codec;
use crate::error::ContractError;
use crate::ledger::{ContractLedger, ContractLedgerMut, TxContext};
use crate::lifecycle::{self, LifecycleManager};
use crate::msg::{
    ConfigResponse, DidHistoryResponse, DidListResponse, ExecuteMsg, InstantiateMsg, KeyUpdate,
    QueryMsg,
};
use crate::query::{did_history, list_dids};
use crate::state::{Config, DidRecord, RecoveredAtPolicy, CONFIG, DEFAULT_MAX_DOCUMENT_BYTES};

const CONTRACT_NAME: &str = "crates.io:did-registry";
const CONTRACT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn instantiate(
    deps: DepsMut,
    _env: Env,
    info: MessageInfo,
    msg: InstantiateMsg,
) -> Result<Response, ContractError> {
    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;

    let admin = match msg.admin {
        Some(admin) => deps.api.addr_validate(&admin)?,
        None => info.sender,
    };

    let config = Config {
        admin,
        max_document_bytes: msg.max_document_bytes.unwrap_or(DEFAULT_MAX_DOCUMENT_BYTES),
        recovered_at_policy: msg.recovered_at_policy.unwrap_or_default(),
        update_key: msg.update_key,
        recovery_key: msg.recovery_key,
    };
    validate_config(&config)?;
    CONFIG.save(deps.storage, &config)?;

    Ok(Response::new()
        .add_attribute("method", "instantiate")
        .add_attribute("admin", config.admin))
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn execute(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    msg: ExecuteMsg,
) -> Result<Response, ContractError> {
    match msg {
        ExecuteMsg::CreateDid {
            did,
            long_form_did,
            document,
        } => execute_create_did(deps, env, did, long_form_did, document),
        ExecuteMsg::UpdateDid {
            did,
            document,
            signature,
        } => execute_update_did(deps, env, did, document, signature),
        ExecuteMsg::RecoverDid {
            did,
            document,
            signature,
        } => execute_recover_did(deps, env, did, document, signature),
        ExecuteMsg::UpdateConfig {
            admin,
            max_document_bytes,
            recovered_at_policy,
            update_key,
            recovery_key,
        } => execute_update_config(
            deps,
            info,
            admin,
            max_document_bytes,
            recovered_at_policy,
            update_key,
            recovery_key,
        ),
    }
}

fn manager<'a>(
    deps: DepsMut<'a>,
    env: &Env,
) -> Result<LifecycleManager<'a, ContractLedgerMut<'a>>, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let tx = TxContext::from_env(env)?;
    let now = tx.timestamp.clone();
    Ok(LifecycleManager::new(
        ContractLedgerMut::new(deps.storage, tx),
        deps.api,
        &config,
        now,
    ))
}

/// The record goes back as response data, encoded exactly as stored
fn record_response(method: &str, record: &DidRecord) -> Result<Response, ContractError> {
    Ok(Response::new()
        .set_data(codec::encode(record)?)
        .add_attribute("method", method)
        .add_attribute("did", &record.did)
        .add_attribute("version", record.version.to_string()))
}

pub fn execute_create_did(
    deps: DepsMut,
    env: Env,
    did: String,
    long_form_did: String,
    document: String,
) -> Result<Response, ContractError> {
    let record = manager(deps, &env)?.create(&did, &long_form_did, document)?;
    record_response("create_did", &record)
}

pub fn execute_update_did(
    deps: DepsMut,
    env: Env,
    did: String,
    document: String,
    signature: Binary,
) -> Result<Response, ContractError> {
    let record = manager(deps, &env)?.update(&did, document, &signature)?;
    record_response("update_did", &record)
}

pub fn execute_recover_did(
    deps: DepsMut,
    env: Env,
    did: String,
    document: String,
    signature: Binary,
) -> Result<Response, ContractError> {
    let record = manager(deps, &env)?.recover(&did, document, &signature)?;
    Ok(record_response("recover_did", &record)?
        .add_attribute("recovered_at", record.recovered_at.unwrap_or_default()))
}

pub fn execute_update_config(
    deps: DepsMut,
    info: MessageInfo,
    admin: Option<String>,
    max_document_bytes: Option<u64>,
    recovered_at_policy: Option<RecoveredAtPolicy>,
    update_key: Option<KeyUpdate>,
    recovery_key: Option<KeyUpdate>,
) -> Result<Response, ContractError> {
    let mut config = CONFIG.load(deps.storage)?;
    if info.sender != config.admin {
        return Err(ContractError::Unauthorized {});
    }

    if let Some(admin) = admin {
        config.admin = deps.api.addr_validate(&admin)?;
    }
    if let Some(max) = max_document_bytes {
        config.max_document_bytes = max;
    }
    if let Some(policy) = recovered_at_policy {
        config.recovered_at_policy = policy;
    }
    if let Some(change) = update_key {
        config.update_key = apply_key_update(change);
    }
    if let Some(change) = recovery_key {
        config.recovery_key = apply_key_update(change);
    }

    validate_config(&config)?;
    CONFIG.save(deps.storage, &config)?;

    Ok(Response::new()
        .add_attribute("method", "update_config")
        .add_attribute("admin", config.admin))
}

fn apply_key_update(change: KeyUpdate) -> Option<Binary> {
    match change {
        KeyUpdate::Set(key) => Some(key),
        KeyUpdate::Clear {} => None,
    }
}

fn validate_config(config: &Config) -> Result<(), ContractError> {
    if config.max_document_bytes == 0 {
        return Err(ContractError::InvalidConfig {
            reason: "max_document_bytes must be greater than zero".to_string(),
        });
    }
    if let Some(key) = &config.update_key {
        validate_key(key)?;
    }
    if let Some(key) = &config.recovery_key {
        validate_key(key)?;
    }
    Ok(())
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn query(deps: Deps, _env: Env, msg: QueryMsg) -> Result<Binary, ContractError> {
    let ledger = ContractLedger::new(deps.storage);
    match msg {
        QueryMsg::GetDid { did } => Ok(to_json_binary(&lifecycle::get(&ledger, &did)?)?),
        QueryMsg::ListDids {
            start_key,
            end_key,
            limit,
        } => {
            let dids = list_dids(
                deps.api,
                &ledger,
                start_key.as_deref().unwrap_or_default(),
                end_key.as_deref().unwrap_or_default(),
                limit,
            )?;
            Ok(to_json_binary(&DidListResponse { dids })?)
        }
        QueryMsg::DidHistory { did } => {
            let entries = did_history(&ledger, &did)?;
            Ok(to_json_binary(&DidHistoryResponse { entries })?)
        }
        QueryMsg::Config {} => Ok(to_json_binary(&query_config(deps)?)?),
    }
}

fn query_config(deps: Deps) -> Result<ConfigResponse, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    Ok(ConfigResponse {
        admin: config.admin,
        max_document_bytes: config.max_document_bytes,
        recovered_at_policy: config.recovered_at_policy,
        update_key: config.update_key,
        recovery_key: config.recovery_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msg::{DidSummary, HistoryEntry};
    use cosmwasm_std::testing::{
        mock_dependencies, mock_env, mock_info, MockApi, MockQuerier, MockStorage,
    };
    use cosmwasm_std::{coins, from_json, Addr, OwnedDeps};

    fn doc(json: &str) -> String {
        json.to_string()
    }

    fn setup() -> OwnedDeps<MockStorage, MockApi, MockQuerier> {
        let mut deps = mock_dependencies();
        let info = mock_info("creator", &coins(1000, "earth"));
        instantiate(deps.as_mut(), mock_env(), info, InstantiateMsg::default()).unwrap();
        deps
    }

    fn env_at(height: u64) -> Env {
        let mut env = mock_env();
        env.block.height = height;
        env.block.time = env.block.time.plus_seconds(height - 12_345);
        env
    }

    #[test]
    fn proper_initialization() {
        let mut deps = mock_dependencies();
        let info = mock_info("creator", &coins(1000, "earth"));
        let res = instantiate(deps.as_mut(), mock_env(), info, InstantiateMsg::default()).unwrap();
        assert_eq!(0, res.messages.len());

        let res = query(deps.as_ref(), mock_env(), QueryMsg::Config {}).unwrap();
        let config: ConfigResponse = from_json(&res).unwrap();
        assert_eq!(config.admin, Addr::unchecked("creator"));
        assert_eq!(config.max_document_bytes, DEFAULT_MAX_DOCUMENT_BYTES);
        assert_eq!(config.recovered_at_policy, RecoveredAtPolicy::PreserveFirst);
        assert_eq!(config.update_key, None);
    }

    #[test]
    fn instantiate_rejects_bad_keys() {
        let mut deps = mock_dependencies();
        let info = mock_info("creator", &[]);
        let msg = InstantiateMsg {
            update_key: Some(Binary::from(vec![1u8; 10])),
            ..InstantiateMsg::default()
        };
        let err = instantiate(deps.as_mut(), mock_env(), info, msg).unwrap_err();
        assert!(matches!(err, ContractError::InvalidConfig { .. }));
    }

    #[test]
    fn did_lifecycle_scenario() {
        let mut deps = setup();
        let info = mock_info("anyone", &[]);

        let msg = ExecuteMsg::CreateDid {
            did: "did:x".to_string(),
            long_form_did: "did:x:long".to_string(),
            document: doc(r#"{"a":1}"#),
        };
        let res = execute(deps.as_mut(), env_at(12_345), info.clone(), msg).unwrap();
        assert_eq!(res.attributes.len(), 3);
        let created: DidRecord = from_json(res.data.unwrap()).unwrap();
        assert_eq!(created.version, 1);

        let res = query(
            deps.as_ref(),
            mock_env(),
            QueryMsg::GetDid {
                did: "did:x".to_string(),
            },
        )
        .unwrap();
        let record: DidRecord = from_json(&res).unwrap();
        assert_eq!(record.version, 1);
        assert!(!record.recovered);
        assert_eq!(record.created_at, "2019-10-23T02:23:39.879Z");

        let msg = ExecuteMsg::UpdateDid {
            did: "did:x".to_string(),
            document: doc(r#"{"a":2}"#),
            signature: Binary::from(b"sig".as_slice()),
        };
        let res = execute(deps.as_mut(), env_at(12_346), info.clone(), msg).unwrap();
        let updated: DidRecord = from_json(res.data.unwrap()).unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.document, doc(r#"{"a":2}"#));
        assert_eq!(updated.updated_at, "2019-10-23T02:23:40.879Z");
        assert_eq!(updated.created_at, created.created_at);

        let msg = ExecuteMsg::RecoverDid {
            did: "did:x".to_string(),
            document: doc(r#"{"a":3}"#),
            signature: Binary::from(b"sig".as_slice()),
        };
        let res = execute(deps.as_mut(), env_at(12_347), info, msg).unwrap();
        let recovered: DidRecord = from_json(res.data.unwrap()).unwrap();
        assert_eq!(recovered.version, 3);
        assert!(recovered.recovered);
        assert_eq!(
            recovered.recovered_at.as_deref(),
            Some("2019-10-23T02:23:41.879Z")
        );

        let res = query(
            deps.as_ref(),
            mock_env(),
            QueryMsg::ListDids {
                start_key: None,
                end_key: None,
                limit: None,
            },
        )
        .unwrap();
        let list: DidListResponse = from_json(&res).unwrap();
        assert_eq!(
            list.dids,
            vec![DidSummary {
                did: "did:x".to_string(),
                created_at: "2019-10-23T02:23:39.879Z".to_string(),
                updated_at: "2019-10-23T02:23:41.879Z".to_string(),
                version: 3,
                recovered: true,
            }]
        );

        let res = query(
            deps.as_ref(),
            mock_env(),
            QueryMsg::DidHistory {
                did: "did:x".to_string(),
            },
        )
        .unwrap();
        let history: DidHistoryResponse = from_json(&res).unwrap();
        assert_eq!(history.entries.len(), 3);

        let versions: Vec<u64> = history
            .entries
            .iter()
            .map(|entry: &HistoryEntry| {
                from_json::<DidRecord>(entry.value.as_bytes()).unwrap().version
            })
            .collect();
        assert_eq!(versions, vec![1, 2, 3]);
        assert_ne!(history.entries[0].tx_id, history.entries[1].tx_id);
        assert_eq!(history.entries[2].timestamp, "2019-10-23T02:23:41.879Z");
    }

    #[test]
    fn create_existing_did_fails() {
        let mut deps = setup();
        let msg = ExecuteMsg::CreateDid {
            did: "did:x".to_string(),
            long_form_did: "did:x:long".to_string(),
            document: doc(r#"{"a":1}"#),
        };
        execute(deps.as_mut(), mock_env(), mock_info("alice", &[]), msg.clone()).unwrap();

        let err = execute(deps.as_mut(), mock_env(), mock_info("bob", &[]), msg).unwrap_err();
        assert_eq!(
            err,
            ContractError::DidExists {
                did: "did:x".to_string()
            }
        );
    }

    #[test]
    fn unknown_did_is_not_found() {
        let mut deps = setup();
        let not_found = ContractError::DidNotFound {
            did: "did:nope".to_string(),
        };

        let msg = ExecuteMsg::UpdateDid {
            did: "did:nope".to_string(),
            document: doc("{}"),
            signature: Binary::default(),
        };
        let err = execute(deps.as_mut(), mock_env(), mock_info("alice", &[]), msg).unwrap_err();
        assert_eq!(err, not_found);

        let msg = ExecuteMsg::RecoverDid {
            did: "did:nope".to_string(),
            document: doc("{}"),
            signature: Binary::default(),
        };
        let err = execute(deps.as_mut(), mock_env(), mock_info("alice", &[]), msg).unwrap_err();
        assert_eq!(err, not_found);

        for msg in [
            QueryMsg::GetDid {
                did: "did:nope".to_string(),
            },
            QueryMsg::DidHistory {
                did: "did:nope".to_string(),
            },
        ] {
            assert_eq!(query(deps.as_ref(), mock_env(), msg).unwrap_err(), not_found);
        }
    }

    #[test]
    fn update_config_is_admin_only() {
        let mut deps = setup();
        let msg = ExecuteMsg::UpdateConfig {
            admin: None,
            max_document_bytes: Some(5),
            recovered_at_policy: Some(RecoveredAtPolicy::OverwriteLatest),
            update_key: Some(KeyUpdate::Set(Binary::from(vec![2u8; 32]))),
            recovery_key: None,
        };

        let err = execute(deps.as_mut(), mock_env(), mock_info("mallory", &[]), msg.clone())
            .unwrap_err();
        assert_eq!(err, ContractError::Unauthorized {});

        execute(deps.as_mut(), mock_env(), mock_info("creator", &[]), msg).unwrap();
        let res = query(deps.as_ref(), mock_env(), QueryMsg::Config {}).unwrap();
        let config: ConfigResponse = from_json(&res).unwrap();
        assert_eq!(config.max_document_bytes, 5);
        assert_eq!(config.recovered_at_policy, RecoveredAtPolicy::OverwriteLatest);
        assert_eq!(config.update_key, Some(Binary::from(vec![2u8; 32])));

        // new size limit applies to creates
        let msg = ExecuteMsg::CreateDid {
            did: "did:x".to_string(),
            long_form_did: "did:x:long".to_string(),
            document: doc(r#"{"a":1}"#),
        };
        let err = execute(deps.as_mut(), mock_env(), mock_info("alice", &[]), msg).unwrap_err();
        assert_eq!(err, ContractError::DocumentTooLarge { size: 7, max: 5 });

        let msg = ExecuteMsg::UpdateConfig {
            admin: None,
            max_document_bytes: None,
            recovered_at_policy: None,
            update_key: Some(KeyUpdate::Clear {}),
            recovery_key: None,
        };
        execute(deps.as_mut(), mock_env(), mock_info("creator", &[]), msg).unwrap();
        let res = query(deps.as_ref(), mock_env(), QueryMsg::Config {}).unwrap();
        let config: ConfigResponse = from_json(&res).unwrap();
        assert_eq!(config.update_key, None);
    }

    #[test]
    fn list_bounds_are_forwarded() {
        let mut deps = setup();
        for did in ["did:a", "did:b", "did:c"] {
            let msg = ExecuteMsg::CreateDid {
                did: did.to_string(),
                long_form_did: format!("{did}:long"),
                document: doc("null"),
            };
            execute(deps.as_mut(), mock_env(), mock_info("alice", &[]), msg).unwrap();
        }

        let res = query(
            deps.as_ref(),
            mock_env(),
            QueryMsg::ListDids {
                start_key: Some("did:b".to_string()),
                end_key: Some("did:c".to_string()),
                limit: None,
            },
        )
        .unwrap();
        let list: DidListResponse = from_json(&res).unwrap();
        let dids: Vec<_> = list.dids.into_iter().map(|s| s.did).collect();
        assert_eq!(dids, vec!["did:b"]);
    }
}
