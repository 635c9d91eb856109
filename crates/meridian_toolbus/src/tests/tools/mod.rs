mod doc_edit;
mod doc_search;
mod doc_tree;
mod doc_view;
mod web_search;
