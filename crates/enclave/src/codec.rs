//! Conversions between the in-enclave and the shipped forms of batches
//! and rollups: canonical encoding, payload encryption, compression.

use std::sync::Arc;

use velum_common::compression::CompressionService;
use velum_crypto::payload::DataEncryptionService;
use velum_primitives::buf::Buf32;
use velum_state::prelude::*;

use crate::errors::{Error, Result};

/// Bridges opened payloads to wire blobs.  The blob layout is
/// `compress(encrypt(borsh(payload)))`; the encryption context is the
/// carrying entity's identity, which keeps the blob deterministic.
pub struct PayloadCodec {
    enc: Arc<DataEncryptionService>,
    comp: CompressionService,
}

impl PayloadCodec {
    pub fn new(enc: Arc<DataEncryptionService>, comp: CompressionService) -> Self {
        Self { enc, comp }
    }

    pub fn to_ext_batch(&self, batch: &Batch) -> Result<ExtBatch> {
        let body = borsh::to_vec(batch.body()).map_err(|e| Error::Codec(e.to_string()))?;
        let sealed = self.enc.encrypt(batch.id().as_ref(), &body)?;
        let payload = self.comp.compress(&sealed)?;
        Ok(ExtBatch {
            header: batch.signed_header().clone(),
            payload,
        })
    }

    pub fn to_batch(&self, ext: &ExtBatch) -> Result<Batch> {
        let sealed = self.comp.decompress(&ext.payload)?;
        let body = self.enc.decrypt(ext.id().as_ref(), &sealed)?;
        let body: BatchBody = borsh::from_slice(&body).map_err(|e| Error::Codec(e.to_string()))?;
        Ok(Batch::new(ext.header.clone(), body))
    }

    /// Bundles full batches into a rollup blob.  The signed header's
    /// sighash is the encryption context, so the consumer can derive it
    /// from the clear header.
    pub fn bundle_rollup(
        &self,
        header: &SignedRollupHeader,
        batches: &[Batch],
    ) -> Result<Vec<u8>> {
        let bytes = borsh::to_vec(&batches.to_vec()).map_err(|e| Error::Codec(e.to_string()))?;
        let sealed = self
            .enc
            .encrypt(header.header().sighash().as_ref(), &bytes)?;
        Ok(self.comp.compress(&sealed)?)
    }

    pub fn unbundle_rollup(&self, ext: &ExtRollup) -> Result<Vec<Batch>> {
        let sealed = self.comp.decompress(&ext.batch_payloads)?;
        let bytes = self
            .enc
            .decrypt(ext.header.header().sighash().as_ref(), &sealed)?;
        borsh::from_slice(&bytes).map_err(|e| Error::Codec(e.to_string()))
    }

    /// Computes the L1-style header hash persisted alongside every batch,
    /// the identity external chain tooling addresses the batch by.
    pub fn converted_header_hash(&self, signed: &SignedBatchHeader) -> Buf32 {
        let h = signed.header();
        // parent + state root + receipts root + height + gas + time + id
        let mut buf = Vec::with_capacity(152);
        buf.extend_from_slice(Buf32::from(h.parent).as_slice());
        buf.extend_from_slice(h.state_root.as_slice());
        buf.extend_from_slice(h.receipts_root.as_slice());
        buf.extend_from_slice(&h.height.to_be_bytes());
        buf.extend_from_slice(&h.gas_used.to_be_bytes());
        buf.extend_from_slice(&h.timestamp.to_be_bytes());
        buf.extend_from_slice(Buf32::from(signed.id()).as_slice());
        velum_primitives::hash::raw(&buf)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use velum_common::compression::CompressionService;
    use velum_crypto::{payload::DataEncryptionService, secret::SharedSecret};
    use velum_primitives::buf::{Buf32, Buf64};
    use velum_state::prelude::*;

    use super::PayloadCodec;

    fn mkcodec() -> PayloadCodec {
        let enc = Arc::new(DataEncryptionService::new());
        enc.set_key(&SharedSecret::generate());
        PayloadCodec::new(enc, CompressionService::max_compression())
    }

    fn mkbatch(seq: u64) -> Batch {
        let header = BatchHeader {
            seq_no: seq,
            height: seq,
            parent: BatchId::zero(),
            l1_proof: L1BlockId::zero(),
            timestamp: 1_700_000_000,
            state_root: Buf32::from([1; 32]),
            txs_root: Buf32::from([2; 32]),
            receipts_root: Buf32::from([3; 32]),
            logs_bloom: LogsBloom::zero(),
            gas_used: 0,
        };
        Batch::new(
            SignedBatchHeader::new(header, Buf64::zero(), 0),
            BatchBody::default(),
        )
    }

    #[test]
    fn test_ext_batch_roundtrip_is_lossless_and_stable() {
        let codec = mkcodec();
        let batch = mkbatch(1);

        let ext = codec.to_ext_batch(&batch).unwrap();
        let opened = codec.to_batch(&ext).unwrap();
        assert_eq!(opened, batch);

        // shipping the reopened batch again yields the identical ext form
        let ext2 = codec.to_ext_batch(&opened).unwrap();
        assert_eq!(ext, ext2);
    }

    #[test]
    fn test_rollup_bundle_roundtrip() {
        let codec = mkcodec();
        let batches = vec![mkbatch(1), mkbatch(2), mkbatch(3)];
        let header = RollupHeader {
            from_seq: 1,
            to_seq: 3,
            l1_proof: L1BlockId::zero(),
        };
        let signed = SignedRollupHeader::new(header, Buf64::zero(), 0);

        let blob = codec.bundle_rollup(&signed, &batches).unwrap();
        let ext = ExtRollup {
            header: signed,
            batch_payloads: blob,
        };
        let out = codec.unbundle_rollup(&ext).unwrap();
        assert_eq!(out, batches);
    }

    #[test]
    fn test_wrong_secret_cannot_open() {
        let codec_a = mkcodec();
        let codec_b = mkcodec(); // different secret
        let ext = codec_a.to_ext_batch(&mkbatch(1)).unwrap();
        assert!(codec_b.to_batch(&ext).is_err());
    }
}
