use std::io;
use std::num::NonZeroUsize;

use anyhow::{Result, bail};
use lru::LruCache;

use crate::cluster::LogCluster;
use crate::config::TemplateMinerConfig;
use crate::node::Node;

/// The online log-template miner.
///
/// Owns a fixed-depth prefix tree (`root`) and an LRU-bounded cluster store
/// (`clusters`). `train` is the only operation that mutates either; `match_cluster`
/// and `clusters()` are read-only apart from the LRU recency touch a successful
/// match performs.
pub struct Drain {
    root: Node,
    clusters: LruCache<usize, LogCluster>,
    cluster_counter: usize,

    max_node_depth: usize,
    sim_th: f64,
    max_children: usize,
    extra_delimiters: Vec<String>,
    param_str: String,
    parametrize_numeric_tokens: bool,
}

impl Drain {
    /// Construct a miner from configuration. Fails if `drain_depth < 3`, since
    /// `max_node_depth = drain_depth - 2` would otherwise be zero or negative.
    pub fn new(config: &TemplateMinerConfig) -> Result<Self> {
        if config.drain_depth < 3 {
            bail!(
                "drain_depth must be at least 3, got {}",
                config.drain_depth
            );
        }

        let clusters = match NonZeroUsize::new(config.drain_max_clusters) {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };

        Ok(Self {
            root: Node::new(),
            clusters,
            cluster_counter: 0,
            max_node_depth: config.drain_depth - 2,
            sim_th: config.drain_sim_th,
            max_children: config.drain_max_children,
            extra_delimiters: config.drain_extra_delimiters.clone(),
            param_str: config.param_string.clone(),
            parametrize_numeric_tokens: config.parametrize_numeric_tokens,
        })
    }

    /// Trim surrounding whitespace, fold extra delimiters to spaces, and split
    /// on single-space boundaries. Adjacent delimiters produce empty tokens,
    /// which are preserved rather than collapsed.
    pub fn tokenize(&self, content: &str) -> Vec<String> {
        let mut content = content.trim().to_string();
        for delimiter in &self.extra_delimiters {
            content = content.replace(delimiter.as_str(), " ");
        }
        content.split(' ').map(|s| s.to_string()).collect()
    }

    /// Ingest a line, creating or updating a cluster, and return it.
    pub fn train(&mut self, content: &str) -> LogCluster {
        let tokens = self.tokenize(content);

        let found = Self::tree_search(
            &self.root,
            &self.clusters,
            &tokens,
            self.sim_th,
            false,
            self.max_node_depth,
            &self.param_str,
        );

        match found {
            Some(id) => {
                let mut cluster = self
                    .clusters
                    .get(&id)
                    .expect("tree leaf referenced a live cluster id")
                    .clone();

                let new_template = Self::create_template(&cluster.template, &tokens, &self.param_str);
                if new_template != cluster.template {
                    log::debug!("cluster_template_changed id={id}");
                    cluster.template = new_template;
                }
                cluster.size += 1;
                self.clusters.put(id, cluster.clone());
                cluster
            }
            None => {
                self.cluster_counter += 1;
                let id = self.cluster_counter;
                let cluster = LogCluster::new(tokens, id);
                self.clusters.put(id, cluster.clone());

                Self::add_seq_to_prefix_tree(
                    &mut self.root,
                    &self.clusters,
                    &cluster,
                    self.max_node_depth,
                    self.max_children,
                    &self.param_str,
                    self.parametrize_numeric_tokens,
                );

                log::debug!("cluster_created id={id} tokens={}", cluster.template.len());
                cluster
            }
        }
    }

    /// Classify a line without mutating any cluster's template or size. A
    /// successful match still touches the LRU recency of the winning cluster.
    pub fn match_cluster(&mut self, content: &str) -> Option<LogCluster> {
        let tokens = self.tokenize(content);
        let id = Self::tree_search(
            &self.root,
            &self.clusters,
            &tokens,
            self.sim_th,
            true,
            self.max_node_depth,
            &self.param_str,
        )?;
        self.clusters.get(&id).cloned()
    }

    /// All live clusters, in no particular order. Never touches LRU recency.
    pub fn clusters(&self) -> Vec<LogCluster> {
        self.clusters.iter().map(|(_, c)| c.clone()).collect()
    }

    /// Render the prefix tree shape and per-leaf cluster ids for troubleshooting.
    pub fn print_tree<W: io::Write>(&self, w: &mut W) -> io::Result<()> {
        self.root.write_tree("", 0, w)
    }

    fn tree_search(
        root: &Node,
        clusters: &LruCache<usize, LogCluster>,
        tokens: &[String],
        sim_th: f64,
        include_params: bool,
        max_node_depth: usize,
        param_str: &str,
    ) -> Option<usize> {
        let token_count = tokens.len();
        let mut cur_node = root.children.get(&token_count.to_string())?;

        if token_count == 0 {
            let id = *cur_node.cluster_ids.first()?;
            return clusters.peek(&id).map(|_| id);
        }

        let mut depth = 1;
        for token in tokens {
            if depth >= max_node_depth || depth >= token_count {
                break;
            }

            cur_node = cur_node
                .children
                .get(token)
                .or_else(|| cur_node.children.get(param_str))?;
            depth += 1;
        }

        Self::fast_match(
            clusters,
            &cur_node.cluster_ids,
            tokens,
            sim_th,
            include_params,
            param_str,
        )
    }

    fn fast_match(
        clusters: &LruCache<usize, LogCluster>,
        cluster_ids: &[usize],
        tokens: &[String],
        sim_th: f64,
        include_params: bool,
        param_str: &str,
    ) -> Option<usize> {
        let mut best: Option<(usize, f64, i32)> = None;

        for &id in cluster_ids {
            let Some(cluster) = clusters.peek(&id) else {
                continue;
            };
            let (sim, param_count) =
                Self::seq_distance(&cluster.template, tokens, include_params, param_str);

            let is_better = match best {
                None => true,
                Some((_, best_sim, best_params)) => {
                    sim > best_sim || (sim == best_sim && param_count > best_params)
                }
            };
            if is_better {
                best = Some((id, sim, param_count));
            }
        }

        best.filter(|&(_, sim, _)| sim >= sim_th).map(|(id, _, _)| id)
    }

    fn seq_distance(
        template: &[String],
        tokens: &[String],
        include_params: bool,
        param_str: &str,
    ) -> (f64, i32) {
        assert_eq!(
            template.len(),
            tokens.len(),
            "seq_distance requires equal-length sequences; tree descent must guarantee this"
        );

        if template.is_empty() {
            return (1.0, 0);
        }

        let mut sim_tokens = 0;
        let mut param_count = 0;

        for (t, tok) in template.iter().zip(tokens.iter()) {
            if t == param_str {
                param_count += 1;
            } else if t == tok {
                sim_tokens += 1;
            }
        }

        if include_params {
            sim_tokens += param_count;
        }

        (sim_tokens as f64 / template.len() as f64, param_count)
    }

    fn create_template(template: &[String], tokens: &[String], param_str: &str) -> Vec<String> {
        assert_eq!(
            template.len(),
            tokens.len(),
            "create_template requires equal-length sequences; tree descent must guarantee this"
        );

        template
            .iter()
            .zip(tokens.iter())
            .map(|(t, tok)| if t == tok { t.clone() } else { param_str.to_string() })
            .collect()
    }

    fn add_seq_to_prefix_tree(
        root: &mut Node,
        clusters: &LruCache<usize, LogCluster>,
        cluster: &LogCluster,
        max_node_depth: usize,
        max_children: usize,
        param_str: &str,
        parametrize_numeric_tokens: bool,
    ) {
        let token_count = cluster.template.len();
        let token_count_str = token_count.to_string();

        if !root.children.contains_key(&token_count_str) {
            root.children.insert(token_count_str.clone(), Node::new());
        }
        let mut cur_node = root.children.get_mut(&token_count_str).unwrap();

        if token_count == 0 {
            cur_node.cluster_ids.push(cluster.id);
            return;
        }

        let mut depth = 1;
        for token in &cluster.template {
            if depth >= max_node_depth || depth >= token_count {
                // Stale ids from evicted clusters accumulate at leaves; drop
                // them on write rather than ever rewriting live leaves.
                cur_node.cluster_ids.retain(|id| clusters.peek(id).is_some());
                cur_node.cluster_ids.push(cluster.id);
                break;
            }

            if cur_node.children.contains_key(token) {
                cur_node = cur_node.children.get_mut(token).unwrap();
            } else {
                let digit_routed = parametrize_numeric_tokens && has_digit(token);

                if digit_routed {
                    if !cur_node.children.contains_key(param_str) {
                        cur_node.children.insert(param_str.to_string(), Node::new());
                    }
                    cur_node = cur_node.children.get_mut(param_str).unwrap();
                } else if cur_node.children.contains_key(param_str) {
                    if cur_node.children.len() < max_children {
                        cur_node.children.insert(token.clone(), Node::new());
                        cur_node = cur_node.children.get_mut(token).unwrap();
                    } else {
                        cur_node = cur_node.children.get_mut(param_str).unwrap();
                    }
                } else if cur_node.children.len() + 1 < max_children {
                    cur_node.children.insert(token.clone(), Node::new());
                    cur_node = cur_node.children.get_mut(token).unwrap();
                } else if cur_node.children.len() + 1 == max_children {
                    cur_node.children.insert(param_str.to_string(), Node::new());
                    cur_node = cur_node.children.get_mut(param_str).unwrap();
                } else {
                    if !cur_node.children.contains_key(param_str) {
                        cur_node.children.insert(param_str.to_string(), Node::new());
                    }
                    cur_node = cur_node.children.get_mut(param_str).unwrap();
                }
            }
            depth += 1;
        }
    }
}

fn has_digit(token: &str) -> bool {
    token.chars().any(|c| c.is_ascii_digit())
}
