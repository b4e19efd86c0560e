use std::collections::HashSet;
use std::sync::Arc;

use ouinet_announcer::Announcer;
use ouinet_core::swarm::{GroupName, PROTOCOL_VERSION};
use ouinet_core::ResourceId;
use ouinet_dht::{DhtClient, UdpEndpoint};
use ouinet_groups::{BackedGroups, TrustedGroups, UntrustedGroups};
use ouinet_lookup::LookupCache;
use ouinet_peer::{MultiPeerReader, PeerConnectorFactory};
use ouinet_sign::{keep_signed, verify_response, Part, ResponseHead};
use ouinet_store::{LocalStore, Store, StoreWriter};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::CacheConfig;
use crate::error::CacheError;
use crate::gc;
use crate::session::{ResponseSource, Session};

/// Top-level cache core: wires the on-disk store, resource groups, DHT
/// announcer, lookup cache, and multi-peer reader into the `load`/`store`
/// surface a front-end (out of scope here) drives.
pub struct CacheClient<D: DhtClient + Send + Sync + 'static, F: PeerConnectorFactory + Send + Sync + 'static> {
    store: LocalStore,
    store_root: std::path::PathBuf,
    groups: BackedGroups,
    dht: Arc<D>,
    announcer: Arc<Announcer<D>>,
    lookup: Arc<LookupCache<D>>,
    factory: Arc<F>,
    config: CacheConfig,
}

impl<D: DhtClient + Send + Sync + 'static, F: PeerConnectorFactory + Send + Sync + 'static> CacheClient<D, F> {
    /// Brings up a cache client: loads the groups tree, runs one GC sweep
    /// over the store before anything else touches it, starts announcing
    /// every surviving group, then starts the periodic GC loop.
    pub async fn start(config: CacheConfig, dht: Arc<D>, factory: Arc<F>) -> Result<Arc<Self>, CacheError> {
        let store_root = config.data_root.join("store");
        let trusted_root = config.data_root.join("dht_groups");
        let untrusted_root = config
            .static_groups_root
            .clone()
            .unwrap_or_else(|| config.data_root.join("static_dht_groups"));

        ouinet_store::sweep_stale_tmp_dirs(&store_root)?;

        let groups = BackedGroups::new(TrustedGroups::new(&trusted_root), UntrustedGroups::new(&untrusted_root));

        let store_root_for_sweep = store_root.clone();
        let groups_for_sweep = groups.clone();
        let max_age = config.max_cached_age;
        tokio::task::spawn_blocking(move || gc::sweep(&store_root_for_sweep, &groups_for_sweep, max_age))
            .await
            .expect("gc sweep task panicked")?;

        let store = LocalStore::new(&store_root);
        let lookup = Arc::new(LookupCache::new(Arc::clone(&dht), config.lookup));
        let announcer = Announcer::new(Arc::clone(&dht), config.announcer);

        for group in groups.groups()? {
            announcer.add(group.swarm_name(&config.injector_pubkey_hex)).await;
        }
        tokio::spawn(Arc::clone(&announcer).run());

        let client = Arc::new(CacheClient {
            store,
            store_root,
            groups,
            dht,
            announcer,
            lookup,
            factory,
            config,
        });

        tokio::spawn(Arc::clone(&client).gc_loop());
        Ok(client)
    }

    async fn gc_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.config.gc_period);
        interval.tick().await;
        loop {
            interval.tick().await;
            match self.gc_sweep().await {
                Ok(emptied) => {
                    if !emptied.is_empty() {
                        info!(count = emptied.len(), "gc sweep emptied groups");
                    }
                }
                Err(err) => warn!(error = %err, "gc sweep failed"),
            }
        }
    }

    async fn gc_sweep(&self) -> Result<Vec<GroupName>, CacheError> {
        let store_root = self.store_root.clone();
        let groups = self.groups.clone();
        let max_age = self.config.max_cached_age;
        let emptied = tokio::task::spawn_blocking(move || gc::sweep(&store_root, &groups, max_age))
            .await
            .expect("gc sweep task panicked")?;
        for group in &emptied {
            self.announcer.remove(&group.swarm_name(&self.config.injector_pubkey_hex)).await;
        }
        Ok(emptied)
    }

    /// Serves `id` from the local store if present and verified; otherwise
    /// looks up `group`'s swarm, assembles the resource from one or more
    /// peers (re-verifying every block against the first peer's hash list),
    /// and returns it without writing it back to the local store (that is
    /// [`Self::store`]'s job, driven by the caller once it decides to keep
    /// what it fetched).
    pub async fn load(&self, id: ResourceId, group: GroupName, cancel: &CancellationToken) -> Result<Session, CacheError> {
        if let Some(session) = self.load_local(&id).await? {
            return Ok(session);
        }

        if cancel.is_cancelled() {
            return Err(CacheError::OperationAborted);
        }

        self.load_remote(group, cancel).await
    }

    async fn load_local(&self, id: &ResourceId) -> Result<Option<Session>, CacheError> {
        let store = self.store.clone();
        let id = *id;
        let result = tokio::task::spawn_blocking(move || store.read_whole(&id))
            .await
            .expect("blocking task panicked");

        match result {
            Ok(parts) => {
                let (head, body) = verify_response(parts, self.config.injector_pubkey)?;
                Ok(Some(Session {
                    source: ResponseSource::LocalCache,
                    head,
                    body,
                }))
            }
            Err(ouinet_store::StoreError::MissingHead) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn load_remote(&self, group: GroupName, cancel: &CancellationToken) -> Result<Session, CacheError> {
        let swarm = group.swarm_name(&self.config.injector_pubkey_hex);
        let peers = self.lookup.get(&swarm).await?;
        if peers.is_empty() {
            return Err(CacheError::NoGoodPeer);
        }

        let mut reader = MultiPeerReader::new(Arc::clone(&self.factory), peers, &self.self_endpoints(), self.config.reader);
        reader.ensure_peer(self.config.injector_pubkey).await?;
        let reference = reader.reference().expect("ensure_peer sets it").clone();

        let mut body = Vec::new();
        for block_id in 0..reference.entries.len() {
            if cancel.is_cancelled() {
                return Err(CacheError::OperationAborted);
            }
            let block = reader.read_block(block_id, self.config.injector_pubkey).await?;
            body.extend_from_slice(&block);
        }

        let head = reader.current_head().ok_or(CacheError::NoGoodPeer)?;

        Ok(Session {
            source: ResponseSource::DistCache,
            head: to_whole_head(head),
            body,
        })
    }

    /// Verifies `parts`, writes the stream (with non-signed-covered headers
    /// stripped) into the local store, and publishes its URI to `group`.
    pub async fn store(&self, parts: Vec<Part>, group: GroupName) -> Result<ResourceId, CacheError> {
        let (head, _body) = verify_response(parts.clone(), self.config.injector_pubkey)?;
        let uri = head
            .get("X-Ouinet-URI")
            .ok_or(CacheError::UnsupportedVersion)?
            .to_string();
        let id = ResourceId::from_canonical_uri(&uri);

        let mut filtered = Vec::with_capacity(parts.len());
        for part in parts {
            filtered.push(match part {
                Part::Head(h) => Part::Head(keep_signed(&h)),
                other => other,
            });
        }

        let store = self.store.clone();
        let tmp_suffix = uuid::Uuid::new_v4().to_string();
        tokio::task::spawn_blocking(move || -> Result<(), CacheError> {
            let mut writer: StoreWriter = store.begin_write(&id, &tmp_suffix)?;
            for part in filtered {
                writer.feed(part)?;
            }
            writer.finish()?;
            Ok(())
        })
        .await
        .expect("blocking task panicked")?;

        self.groups.add(&group, &uri)?;
        self.announcer.add(group.swarm_name(&self.config.injector_pubkey_hex)).await;

        Ok(id)
    }

    /// Serves a locally-stored resource: `range` selects a byte range as in
    /// a Range GET, `None` the whole entry. Rejects a request carrying no
    /// supported `X-Ouinet-Version`.
    pub async fn serve_local(
        &self,
        request_version: u32,
        uri: &str,
        range: Option<(u64, u64)>,
    ) -> Result<Vec<Part>, CacheError> {
        if request_version != PROTOCOL_VERSION {
            return Err(CacheError::UnsupportedVersion);
        }

        let id = ResourceId::from_canonical_uri(uri);
        let store = self.store.clone();
        let result = tokio::task::spawn_blocking(move || match range {
            Some((first, last)) => store.read_range(&id, first, last),
            None => store.read_whole(&id),
        })
        .await
        .expect("blocking task panicked");

        result.map_err(to_serve_error)
    }

    /// Serves the PROPFIND-equivalent hash-list response for `uri`.
    pub async fn serve_hash_list(&self, request_version: u32, uri: &str) -> Result<(ResponseHead, Vec<u8>), CacheError> {
        if request_version != PROTOCOL_VERSION {
            return Err(CacheError::UnsupportedVersion);
        }

        let id = ResourceId::from_canonical_uri(uri);
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.read_hash_list(&id))
            .await
            .expect("blocking task panicked")
            .map_err(to_serve_error)
    }

    /// Drops every locally-stored entry and unpublishes it from its group.
    pub async fn local_purge(&self) -> Result<(), CacheError> {
        let store_root = self.store_root.clone();
        let groups = self.groups.clone();
        let emptied = tokio::task::spawn_blocking(move || gc::purge_all(&store_root, &groups))
            .await
            .expect("blocking task panicked")?;
        for group in emptied {
            self.announcer.remove(&group.swarm_name(&self.config.injector_pubkey_hex)).await;
        }
        Ok(())
    }

    /// Total on-disk size, in bytes, of the local store.
    pub async fn local_size(&self) -> Result<u64, CacheError> {
        let store = self.store.clone();
        let size = tokio::task::spawn_blocking(move || store.size())
            .await
            .expect("blocking task panicked")?;
        Ok(size)
    }

    fn self_endpoints(&self) -> HashSet<UdpEndpoint> {
        let mut set = self.dht.local_endpoints();
        set.extend(self.dht.wan_endpoints());
        set
    }
}

fn to_serve_error(err: ouinet_store::StoreError) -> CacheError {
    match err {
        ouinet_store::StoreError::MissingHead => CacheError::NotFound,
        ouinet_store::StoreError::InvalidSeek => CacheError::InvalidSeek,
        other => CacheError::Store(other),
    }
}

/// Reverts a range response's head to look like a whole-resource head: the
/// original status (stashed under `X-Ouinet-HTTP-Status` by a range read)
/// replaces the outer `206`, and `Content-Range` is dropped.
fn to_whole_head(mut head: ResponseHead) -> ResponseHead {
    if let Some(status) = head.get("X-Ouinet-HTTP-Status").and_then(|s| s.parse().ok()) {
        head.status = status;
    }
    head.remove("X-Ouinet-HTTP-Status");
    head.remove("Content-Range");
    head
}
