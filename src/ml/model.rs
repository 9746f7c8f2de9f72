use burn::{
    nn::{
        attention::{generate_autoregressive_mask, MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        loss::CrossEntropyLossConfig,
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally - do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct GptConfig {
    pub vocab_size: usize,
    /// Context length T
    pub block_size: usize,
    pub n_embd:     usize,
    pub n_heads:    usize,
    pub n_layers:   usize,
    pub ffn_hidden: usize,
    pub dropout:    f64,
}

impl GptConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> GptModel<B> {
        let token_embedding    = EmbeddingConfig::new(self.vocab_size, self.n_embd).init(device);
        let position_embedding = EmbeddingConfig::new(self.block_size, self.n_embd).init(device);
        let blocks: Vec<DecoderBlock<B>> = (0..self.n_layers)
            .map(|_| self.build_decoder_block(device))
            .collect();
        let final_norm = LayerNormConfig::new(self.n_embd).init(device);
        let lm_head    = LinearConfig::new(self.n_embd, self.vocab_size).init(device);
        let dropout    = DropoutConfig::new(self.dropout).init();
        GptModel {
            token_embedding, position_embedding, blocks,
            final_norm, lm_head, dropout,
            block_size: self.block_size,
        }
    }

    fn build_decoder_block<B: Backend>(&self, device: &B::Device) -> DecoderBlock<B> {
        let self_attn   = MultiHeadAttentionConfig::new(self.n_embd, self.n_heads)
            .with_dropout(self.dropout)
            .init(device);
        let ffn_linear1 = LinearConfig::new(self.n_embd, self.ffn_hidden).init(device);
        let ffn_linear2 = LinearConfig::new(self.ffn_hidden, self.n_embd).init(device);
        let norm1   = LayerNormConfig::new(self.n_embd).init(device);
        let norm2   = LayerNormConfig::new(self.n_embd).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        DecoderBlock { self_attn, ffn_linear1, ffn_linear2, norm1, norm2, dropout }
    }
}

/// Pre-norm transformer block with causal self-attention.
#[derive(Module, Debug)]
pub struct DecoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> DecoderBlock<B> {
    pub fn forward(&self, x: Tensor<B, 3>, causal_mask: Tensor<B, 3, Bool>) -> Tensor<B, 3> {
        let attn_in  = MhaInput::self_attn(self.norm1.forward(x.clone())).mask_attn(causal_mask);
        let attn_out = self.self_attn.forward(attn_in).context;
        let x = x + self.dropout.forward(attn_out);

        let ffn_out = self.ffn_linear2.forward(
            burn::tensor::activation::gelu(self.ffn_linear1.forward(self.norm2.forward(x.clone())))
        );
        x + self.dropout.forward(ffn_out)
    }
}

#[derive(Module, Debug)]
pub struct GptModel<B: Backend> {
    pub token_embedding:    Embedding<B>,
    pub position_embedding: Embedding<B>,
    pub blocks:             Vec<DecoderBlock<B>>,
    pub final_norm:         LayerNorm<B>,
    pub lm_head:            Linear<B>,
    pub dropout:            Dropout,
    pub block_size:         usize,
}

impl<B: Backend> GptModel<B> {
    /// inputs: [batch, seq_len] with seq_len <= block_size → logits: [batch, seq_len, vocab]
    pub fn forward(&self, inputs: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let [batch_size, seq_len] = inputs.dims();
        let device = inputs.device();

        let tok_emb   = self.token_embedding.forward(inputs);
        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &device)
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        let pos_emb   = self.position_embedding.forward(positions);

        // position i may only attend to positions <= i
        let causal_mask = generate_autoregressive_mask::<B>(batch_size, seq_len, &device);

        let mut x = self.dropout.forward(tok_emb + pos_emb);
        for block in &self.blocks {
            x = block.forward(x, causal_mask.clone());
        }
        let x = self.final_norm.forward(x);

        self.lm_head.forward(x)
    }

    /// Mean next-token cross-entropy over every position of the batch.
    pub fn forward_loss(
        &self,
        inputs:  Tensor<B, 2, Int>,
        targets: Tensor<B, 2, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 3>) {
        let logits = self.forward(inputs);
        let [batch_size, seq_len, vocab] = logits.dims();

        let ce   = CrossEntropyLossConfig::new().init(&logits.device());
        let loss = ce.forward(
            logits.clone().reshape([batch_size * seq_len, vocab]),
            targets.reshape([batch_size * seq_len]),
        );
        (loss, logits)
    }
}
