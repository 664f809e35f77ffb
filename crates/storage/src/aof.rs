use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use dashmap::DashMap;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Duration, interval};
use tracing::{error, info, warn};

use kvbridge_common::{AOF_CHANNEL_CAPACITY, RecordError, StorageError};

use crate::Adapter;
use crate::record::Record;

/// Política de fsync.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub enum FsyncPolicy {
    /// Fsync após cada write.
    Always,
    /// Fsync a cada segundo.
    #[default]
    EverySec,
    /// Sem fsync explícito (deixa pro OS).
    No,
}

/// Mensagens aceitas pela task de escrita. Toda mensagem carrega a
/// confirmação do resultado de I/O.
enum WriterMsg {
    /// Confirmado após o write (e o fsync, sob `FsyncPolicy::Always`).
    Append(Record, oneshot::Sender<io::Result<()>>),
    /// Flush + fsync imediato.
    Sync(oneshot::Sender<io::Result<()>>),
}

/// Dono do arquivo AOF. Vive dentro da task de escrita.
struct AofWriter {
    out: BufWriter<File>,
    policy: FsyncPolicy,
    scratch: BytesMut,
}

impl AofWriter {
    fn new(file: File, policy: FsyncPolicy) -> Self {
        Self {
            out: BufWriter::new(file),
            policy,
            scratch: BytesMut::new(),
        }
    }

    /// Inicia a task de escrita e devolve o lado de envio do channel.
    fn spawn(self) -> mpsc::Sender<WriterMsg> {
        let (tx, rx) = mpsc::channel(AOF_CHANNEL_CAPACITY);
        tokio::spawn(self.run(rx));
        tx
    }

    async fn append(&mut self, record: &Record) -> io::Result<()> {
        self.scratch.clear();
        record.encode(&mut self.scratch);
        self.out.write_all(&self.scratch).await?;
        if self.policy == FsyncPolicy::Always {
            self.sync().await?;
        }
        Ok(())
    }

    async fn sync(&mut self) -> io::Result<()> {
        self.out.flush().await?;
        self.out.get_ref().sync_data().await
    }

    /// Atende mensagens até o último `AofAdapter` ser descartado.
    ///
    /// Qualquer falha de I/O encerra a task: o log pode ter ficado com um
    /// registro parcial, e escritas seguintes falham com `Unavailable` em vez
    /// de anexar depois dele.
    async fn run(mut self, mut rx: mpsc::Receiver<WriterMsg>) {
        let mut tick = interval(Duration::from_secs(1));

        loop {
            let healthy = tokio::select! {
                msg = rx.recv() => match msg {
                    Some(WriterMsg::Append(record, ack)) => {
                        let result = self.append(&record).await;
                        let healthy = result.is_ok();
                        let _ = ack.send(result);
                        healthy
                    }
                    Some(WriterMsg::Sync(ack)) => {
                        let result = self.sync().await;
                        let healthy = result.is_ok();
                        let _ = ack.send(result);
                        healthy
                    }
                    None => break,
                },
                _ = tick.tick(), if self.policy == FsyncPolicy::EverySec => {
                    match self.sync().await {
                        Ok(()) => true,
                        Err(e) => {
                            error!("AOF: fsync periódico falhou: {e}");
                            false
                        }
                    }
                }
            };

            if !healthy {
                error!("AOF writer parado após falha de I/O");
                return;
            }
        }

        match self.sync().await {
            Ok(()) => info!("AOF writer encerrado"),
            Err(e) => error!("AOF: flush final falhou: {e}"),
        }
    }
}

/// Backend persistente: índice em memória + log append-only em disco.
///
/// Não tem TTL nativo, então o carimbo de expiração gravado pelo Store é
/// persistido junto com o valor e continua valendo após reabrir o arquivo.
/// O índice só muda depois que a task de escrita confirma o registro.
#[derive(Clone)]
pub struct AofAdapter {
    index: Arc<DashMap<String, Bytes>>,
    tx: mpsc::Sender<WriterMsg>,
}

impl AofAdapter {
    /// Abre (ou cria) o arquivo, reconstrói o índice e inicia a task de escrita.
    pub async fn open(path: impl Into<PathBuf>, policy: FsyncPolicy) -> Result<Self, StorageError> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        let index = Arc::new(DashMap::new());
        let count = replay_aof(&path, &index).await?;
        if count > 0 {
            info!("{count} registros restaurados do AOF");
        }

        info!("AOF writer iniciado: {path:?} ({policy:?})");
        let tx = AofWriter::new(file, policy).spawn();
        Ok(Self { index, tx })
    }

    /// Garante que tudo enviado até aqui chegou ao disco.
    pub async fn sync(&self) -> Result<(), StorageError> {
        self.request(WriterMsg::Sync).await
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    async fn append(&self, record: Record) -> Result<(), StorageError> {
        self.request(|ack| WriterMsg::Append(record, ack)).await
    }

    async fn request<F>(&self, msg: F) -> Result<(), StorageError>
    where
        F: FnOnce(oneshot::Sender<io::Result<()>>) -> WriterMsg,
    {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(msg(ack_tx))
            .await
            .map_err(|_| writer_closed())?;
        ack_rx.await.map_err(|_| writer_closed())??;
        Ok(())
    }
}

fn writer_closed() -> StorageError {
    StorageError::Unavailable("AOF writer encerrado".into())
}

#[async_trait]
impl Adapter for AofAdapter {
    fn name(&self) -> &'static str {
        "aof"
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, StorageError> {
        Ok(self.index.get(key).map(|v| v.clone()))
    }

    async fn set(
        &self,
        key: &str,
        value: Bytes,
        _ttl: Option<Duration>,
    ) -> Result<(), StorageError> {
        self.append(Record::Set {
            key: key.to_string(),
            value: value.clone(),
        })
        .await?;
        self.index.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        if !self.index.contains_key(key) {
            return Ok(false);
        }
        self.append(Record::Del(key.to_string())).await?;
        Ok(self.index.remove(key).is_some())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.append(Record::Clear).await?;
        self.index.clear();
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.index.iter().map(|e| e.key().clone()).collect())
    }

    async fn has(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.index.contains_key(key))
    }
}

/// Lê o arquivo AOF e re-aplica os registros no índice para reconstruir estado.
async fn replay_aof(path: &Path, index: &DashMap<String, Bytes>) -> Result<usize, StorageError> {
    if !path.exists() {
        info!("arquivo AOF não encontrado, iniciando sem dados");
        return Ok(0);
    }

    let mut file = File::open(path).await?;
    let mut data = Vec::new();
    file.read_to_end(&mut data).await?;

    let mut cursor = Cursor::new(&data[..]);
    let mut count = 0;

    while (cursor.position() as usize) < data.len() {
        match next_record(&mut cursor) {
            Ok(record) => {
                apply_record(record, index);
                count += 1;
            }
            Err(RecordError::Incomplete) => {
                warn!("AOF: registro truncado no final do arquivo, ignorando o resto");
                break;
            }
            Err(e) => {
                warn!("AOF: registro inválido no byte {}, ignorando o resto: {e}", cursor.position());
                break;
            }
        }
    }

    info!("AOF replay completo: {count} registros aplicados");
    Ok(count)
}

/// Valida um registro inteiro antes de consumi-lo.
fn next_record(cursor: &mut Cursor<&[u8]>) -> Result<Record, RecordError> {
    let start = cursor.position();
    Record::check(cursor)?;
    cursor.set_position(start);
    Record::parse(cursor)
}

fn apply_record(record: Record, index: &DashMap<String, Bytes>) {
    match record {
        Record::Set { key, value } => {
            index.insert(key, value);
        }
        Record::Del(key) => {
            index.remove(&key);
        }
        Record::Clear => index.clear(),
    }
}
